use cablenet_lib::{Config, JoinStyle};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Cablenet - Evaluate track, tube and cable geometry fixtures given as WKT
pub struct Settings {
    #[clap(subcommand)]
    pub command: Command,

    /// Boundary edges longer than this keep an inset vertex (local units)
    #[clap(long, default_value = "1.0", global = true)]
    pub trim_threshold: f64,

    /// Distance of the inset vertex from the boundary vertex (local units)
    #[clap(long, default_value = "0.5", global = true)]
    pub boundary_inset: f64,

    /// Lateral distance between cables sharing a tube (local units)
    #[clap(long, default_value = "0.1", global = true)]
    pub cable_spacing: f64,

    /// Millimetres in one local unit
    #[clap(long, default_value = "1000.0", global = true, value_parser = positive)]
    pub millimetres_per_unit: f64,

    /// Mitre joins longer than this multiple of the offset distance are bevelled
    #[clap(long, default_value = "5.0", global = true, value_parser = positive)]
    pub mitre_limit: f64,

    /// Distance under which two vertices are the same junction (local units)
    #[clap(long, default_value = "0.000001", global = true)]
    pub vertex_tolerance: f64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Split a line at every crossing with a cutting line
    Split {
        /// LINESTRING to split
        line: String,
        /// LINESTRING used as the blade
        cutter: String,
    },

    /// Direction at every vertex of a line, in degrees clockwise from north
    Azimuths {
        line: String,
        /// Report angles in [0, 360) instead of (-180, 180]
        #[clap(long, default_value = "false")]
        normalize: bool,
        /// Round to whole degrees
        #[clap(long, default_value = "false")]
        round: bool,
    },

    /// Offset curve of a line, heights copied from the source vertices
    Offset {
        line: String,
        /// Signed distance, positive to the left (local units)
        #[clap(allow_hyphen_values = true)]
        distance: f64,
        #[clap(long, value_enum, default_value = "mitre")]
        join: JoinArg,
    },

    /// Portion of a line between two length fractions
    Substring {
        line: String,
        start: f64,
        end: f64,
    },

    /// Create a track, cut it, lay a tube along every section and route cables through it
    Scenario {
        /// LINESTRING or MULTILINESTRING of the track
        track: String,
        /// LINESTRING cutting the track before the tube is laid
        #[clap(long)]
        cutter: Option<String>,
        /// Lateral tube offset (mm)
        #[clap(long, default_value = "100", allow_hyphen_values = true)]
        offset_x: i32,
        /// Vertical tube offset (mm)
        #[clap(long, default_value = "0", allow_hyphen_values = true)]
        offset_z: i32,
        /// Number of cables in the tube
        #[clap(long, default_value = "0")]
        cables: usize,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinArg {
    Mitre,
    Bevel,
}

impl From<JoinArg> for JoinStyle {
    fn from(join: JoinArg) -> Self {
        match join {
            JoinArg::Mitre => JoinStyle::Mitre,
            JoinArg::Bevel => JoinStyle::Bevel,
        }
    }
}

/// Finite numbers above zero
fn positive(value: &str) -> Result<f64, String> {
    let number: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if number.is_finite() && number > 0.0 {
        Ok(number)
    } else {
        Err(format!("{} is not a positive number", value))
    }
}

impl Settings {
    pub fn config(&self) -> Config {
        Config {
            trim_threshold: self.trim_threshold,
            boundary_inset: self.boundary_inset,
            cable_spacing: self.cable_spacing,
            millimetres_per_unit: self.millimetres_per_unit,
            mitre_limit: self.mitre_limit,
            vertex_tolerance: self.vertex_tolerance,
        }
    }
}
