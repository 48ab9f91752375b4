mod settings;

use cablenet_lib::geometry::wkt::{self, ToWkt};
use cablenet_lib::geometry::{azimuths_along_line, offset_curve, split, substring};
use cablenet_lib::utils::normalize_degrees;
use cablenet_lib::{
    Cable, CableAttributes, Coord3, LineString3, Network, Offsets, Repository, Tube,
    TubeAttributes,
};
use clap::Parser;
use serde_json::{Value, json};
use settings::{Command, Settings};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn setup_logging() {
    // Results go to stdout, logs stay on stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    setup_logging();

    match run(&settings) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Failed to encode output: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> cablenet_lib::Result<Value> {
    let config = settings.config();

    match &settings.command {
        Command::Split { line, cutter } => {
            let line = wkt::parse_line_string(line)?;
            let cutter = wkt::parse_line_string(cutter)?;
            let pieces: Vec<String> = split(&line, &cutter).iter().map(ToWkt::to_wkt).collect();
            Ok(json!({ "pieces": pieces }))
        }

        Command::Azimuths {
            line,
            normalize,
            round,
        } => {
            let line = wkt::parse_line_string(line)?;
            let mut azimuths = azimuths_along_line(&line);
            if *normalize {
                azimuths.iter_mut().for_each(|a| *a = normalize_degrees(*a));
            }
            if *round {
                let whole: Vec<i32> = azimuths.iter().map(|a| a.round() as i32).collect();
                return Ok(json!({ "azimuths": whole }));
            }
            Ok(json!({ "azimuths": azimuths }))
        }

        Command::Offset {
            line,
            distance,
            join,
        } => {
            let line = wkt::parse_line_string(line)?;
            let offset = offset_curve(&line, *distance, (*join).into(), config.mitre_limit).map(
                |curve| {
                    let coords: Vec<Coord3> = curve
                        .vertices()
                        .map(|(c, source)| Coord3::new(c.x, c.y, line.coords()[source].z))
                        .collect();
                    LineString3::new(coords).to_wkt()
                },
            );
            Ok(json!({ "line": offset }))
        }

        Command::Substring { line, start, end } => {
            let line = wkt::parse_line_string(line)?;
            let portion = substring(&line, *start, *end).map(|l| l.to_wkt());
            Ok(json!({ "line": portion }))
        }

        Command::Scenario {
            track,
            cutter,
            offset_x,
            offset_z,
            cables,
        } => {
            let mut network = Network::new(config);
            let track = network.create_track_wkt(None, track)?;
            let outcome = match cutter {
                Some(cutter) => Some(network.split_track(track, &wkt::parse_line_string(cutter)?)?),
                None => None,
            };

            let sections = network.store().sections_of(track);
            let tube = network.create_tube(TubeAttributes::default())?;
            for section in &sections {
                network.add_tube_section(tube, section.id, Offsets::uniform(*offset_x, *offset_z))?;
            }
            let mut cable_ids = Vec::with_capacity(*cables);
            for _ in 0..*cables {
                let cable = network.create_cable(CableAttributes::default())?;
                network.add_cable_tube(cable, tube)?;
                cable_ids.push(cable);
            }

            let tube_wkt = network.get::<Tube>(tube)?.geom.map(|g| g.to_wkt());
            let mut cable_wkts = Vec::with_capacity(cable_ids.len());
            for cable in cable_ids {
                cable_wkts.push(network.get::<Cable>(cable)?.geom.map(|g| g.to_wkt()));
            }
            let profile = match sections.first() {
                Some(section) => Some(network.section_profile(section.id)?),
                None => None,
            };

            Ok(json!({
                "split": outcome,
                "sections": sections.iter().map(|s| s.geom.to_wkt()).collect::<Vec<_>>(),
                "tube": tube_wkt,
                "cables": cable_wkts,
                "profile": profile,
                "info": network.info(),
            }))
        }
    }
}
