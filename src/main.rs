// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use hiroute::types::{Properties, SegmentFlags};
use hiroute::{
    Graph, GraphBuilder, Highway, Optimize, Property, RouteOptions, Transport, Transports, Way,
    Waypoint, BICYCLE_PROFILE, CAR_PROFILE, FOOT_PROFILE,
};

#[derive(Debug, thiserror::Error)]
#[error("{}:{}: {}", .0.display(), .1, .2)]
struct GraphLoadError(PathBuf, usize, String);

#[derive(Parser)]
#[command(about = "Hierarchical route planner over preprocessed road networks")]
struct Cli {
    /// The path to the graph file
    graph_file: PathBuf,

    /// Waypoints to visit, as node indices in the graph file
    #[arg(required = true, num_args = 2..)]
    waypoints: Vec<u32>,

    /// The profile to route with: car, bicycle or foot
    #[arg(long, default_value = "car")]
    profile: String,

    /// Optimize for travel time instead of distance
    #[arg(long)]
    quickest: bool,

    /// Return to the first waypoint at the end
    #[arg(long = "loop")]
    loop_route: bool,

    /// Visit the waypoints in reverse order
    #[arg(long)]
    reverse: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let graph = load_graph(&cli.graph_file)?;
    let profile = match cli.profile.as_str() {
        "car" => CAR_PROFILE,
        "bicycle" => BICYCLE_PROFILE,
        "foot" => FOOT_PROFILE,
        other => return Err(format!("unknown profile: {:?}", other).into()),
    };

    let waypoints: Vec<Waypoint> = cli.waypoints.iter().map(|&n| Waypoint::Node(n)).collect();
    let options = RouteOptions {
        optimize: if cli.quickest {
            Optimize::Duration
        } else {
            Optimize::Distance
        },
        loop_route: cli.loop_route,
        reverse: cli.reverse,
    };

    let route = hiroute::find_route(&graph, &profile, &waypoints, options, None)?;

    let mut coordinates = Vec::new();
    for (i, leg) in route.legs.iter().enumerate() {
        for (j, point) in leg.route().enumerate() {
            // legs share their boundary nodes
            if i > 0 && j == 0 {
                continue;
            }
            let (lat, lon) = route.position(&graph, point.node);
            coordinates.push((lon, lat));
        }
    }

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{ \"score\": {} }},", route.total_score());

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut points = coordinates.iter().peekable();
    while let Some((lon, lat)) = points.next() {
        let suffix = if points.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", lon, lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

/// Running counts of the entities added so far, for validating
/// cross-references before handing them to the builder.
#[derive(Default)]
struct Counts {
    nodes: u32,
    ways: u32,
    segments: u32,
}

fn load_graph<P: AsRef<Path>>(path: P) -> Result<Graph, Box<dyn Error>> {
    let text = fs::read_to_string(path.as_ref())?;
    let mut builder = GraphBuilder::new();
    let mut counts = Counts::default();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        parse_record(&mut builder, &mut counts, line).map_err(|message| {
            GraphLoadError(path.as_ref().to_path_buf(), lineno + 1, message)
        })?;
    }

    Ok(builder.build())
}

/// Parses one record of the plain-text graph format:
///
/// ```text
/// node <lat> <lon> [super] [allow=<csv>]
/// way <highway> <speed> [allow=<csv>] [props=<csv>]
/// segment <node1> <node2> <way> <distance> [normal] [super] [oneway] [oneway-rev]
/// restriction <from-segment> <via-node> <to-segment> [except=<csv>]
/// ```
fn parse_record(builder: &mut GraphBuilder, counts: &mut Counts, line: &str) -> Result<(), String> {
    let mut fields = line.split_whitespace();
    let kind = fields.next().ok_or("empty record")?;
    match kind {
        "node" => {
            let lat = next_value(&mut fields, "latitude")?;
            let lon = next_value(&mut fields, "longitude")?;
            let mut allow = Transports::ALL;
            let mut super_node = false;
            for extra in fields {
                if extra == "super" {
                    super_node = true;
                } else if let Some(csv) = extra.strip_prefix("allow=") {
                    allow = parse_transports(csv)?;
                } else {
                    return Err(format!("unexpected field: {:?}", extra));
                }
            }
            builder.add_node(lat, lon, allow, super_node);
            counts.nodes += 1;
        }

        "way" => {
            let highway: Highway = next_value(&mut fields, "highway")?;
            let speed = next_value(&mut fields, "speed")?;
            let mut way = Way::new(highway, Transports::ALL, Properties::default(), speed);
            for extra in fields {
                if let Some(csv) = extra.strip_prefix("allow=") {
                    way.allow = parse_transports(csv)?;
                } else if let Some(csv) = extra.strip_prefix("props=") {
                    way.props = parse_properties(csv)?;
                } else if let Some(v) = extra.strip_prefix("weight=") {
                    way.weight = parse_value(v, "weight")?;
                } else if let Some(v) = extra.strip_prefix("height=") {
                    way.height = parse_value(v, "height")?;
                } else if let Some(v) = extra.strip_prefix("width=") {
                    way.width = parse_value(v, "width")?;
                } else if let Some(v) = extra.strip_prefix("length=") {
                    way.length = parse_value(v, "length")?;
                } else {
                    return Err(format!("unexpected field: {:?}", extra));
                }
            }
            builder.add_way(way);
            counts.ways += 1;
        }

        "segment" => {
            let node1: u32 = next_value(&mut fields, "node1")?;
            let node2: u32 = next_value(&mut fields, "node2")?;
            let way: u32 = next_value(&mut fields, "way")?;
            let distance: f32 = next_value(&mut fields, "distance")?;
            if node1 >= counts.nodes || node2 >= counts.nodes {
                return Err("segment references an unknown node".to_string());
            }
            if node1 == node2 {
                return Err("segment endpoints must differ".to_string());
            }
            if way >= counts.ways {
                return Err("segment references an unknown way".to_string());
            }

            let mut flags = SegmentFlags::default();
            for extra in fields {
                flags = match extra {
                    "normal" => flags.with(SegmentFlags::NORMAL),
                    "super" => flags.with(SegmentFlags::SUPER),
                    "oneway" => flags.with(SegmentFlags::ONEWAY_1TO2),
                    "oneway-rev" => flags.with(SegmentFlags::ONEWAY_2TO1),
                    _ => return Err(format!("unexpected flag: {:?}", extra)),
                };
            }
            if flags == SegmentFlags::default() {
                flags = SegmentFlags::NORMAL;
            }
            builder.add_segment(node1, node2, way, distance, flags);
            counts.segments += 1;
        }

        "restriction" => {
            let from: u32 = next_value(&mut fields, "from-segment")?;
            let via: u32 = next_value(&mut fields, "via-node")?;
            let to: u32 = next_value(&mut fields, "to-segment")?;
            if from >= counts.segments || to >= counts.segments {
                return Err("restriction references an unknown segment".to_string());
            }
            if via >= counts.nodes {
                return Err("restriction references an unknown node".to_string());
            }
            let mut excluded = Transports::ALL;
            for extra in fields {
                if let Some(csv) = extra.strip_prefix("except=") {
                    excluded = parse_transports(csv)?;
                } else {
                    return Err(format!("unexpected field: {:?}", extra));
                }
            }
            builder.add_relation(from, via, to, excluded);
        }

        _ => return Err(format!("unknown record kind: {:?}", kind)),
    }
    Ok(())
}

fn next_value<'a, T, I>(fields: &mut I, what: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    I: Iterator<Item = &'a str>,
{
    let field = fields.next().ok_or_else(|| format!("missing {}", what))?;
    parse_value(field, what)
}

fn parse_value<T>(field: &str, what: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    field
        .parse()
        .map_err(|e| format!("invalid {} {:?}: {}", what, field, e))
}

fn parse_transports(csv: &str) -> Result<Transports, String> {
    match csv {
        "all" => Ok(Transports::ALL),
        "none" => Ok(Transports::NONE),
        _ => csv.split(',').try_fold(Transports::NONE, |acc, name| {
            let transport: Transport = parse_value(name, "transport")?;
            Ok(acc.with(Transports::single(transport)))
        }),
    }
}

fn parse_properties(csv: &str) -> Result<Properties, String> {
    csv.split(',').try_fold(Properties::default(), |acc, name| {
        let property: Property = parse_value(name, "property")?;
        Ok(acc.with(property))
    })
}
