//! Numeric configuration for the registration pipeline.
//!
//! All eight parameters are required — there are no internal defaults — and
//! every one must be strictly positive. Validation happens once, before any
//! file is read or any processing starts; an invalid value is a configuration
//! error, never a runtime algorithm error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration failure, reported before any processing begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file could not be parsed as TOML
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// A required parameter was given neither in the config file nor on the
    /// command line
    #[error("missing required parameter `{name}`")]
    MissingParameter {
        /// Parameter name
        name: &'static str,
    },

    /// A parameter value violates its constraint
    #[error("invalid parameter `{name}` = {value}: must be {constraint}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
        /// Human-readable constraint
        constraint: &'static str,
    },
}

/// The validated numeric parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// ICP iteration budget per frame
    pub icp_max_iterations: u32,
    /// Voxel edge length for downsampling the first frame (meters)
    pub voxel_size: f32,
    /// Minimum pairwise distance among SAC-IA sample points (meters)
    pub min_sample_distance: f32,
    /// SAC-IA correspondence/truncation distance (meters)
    pub sac_max_correspondence_distance: f32,
    /// ICP correspondence rejection distance (meters)
    pub icp_max_correspondence_distance: f32,
    /// SAC-IA iteration budget
    pub sac_max_iterations: u32,
    /// Normal-estimation neighborhood radius (meters)
    pub normal_radius: f32,
    /// FPFH descriptor search radius (meters; typically larger than
    /// `normal_radius`)
    pub feature_radius: f32,
}

impl Params {
    /// Check every parameter against its constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter {
                    name,
                    value: value as f64,
                    constraint: "a finite value greater than zero",
                })
            }
        }
        fn at_least_one(name: &'static str, value: u32) -> Result<(), ConfigError> {
            if value >= 1 {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter {
                    name,
                    value: value as f64,
                    constraint: "at least 1",
                })
            }
        }

        at_least_one("icp_max_iterations", self.icp_max_iterations)?;
        at_least_one("sac_max_iterations", self.sac_max_iterations)?;
        positive("voxel_size", self.voxel_size)?;
        positive("min_sample_distance", self.min_sample_distance)?;
        positive(
            "sac_max_correspondence_distance",
            self.sac_max_correspondence_distance,
        )?;
        positive(
            "icp_max_correspondence_distance",
            self.icp_max_correspondence_distance,
        )?;
        positive("normal_radius", self.normal_radius)?;
        positive("feature_radius", self.feature_radius)?;
        Ok(())
    }
}

/// A possibly-incomplete parameter set, as read from a TOML file or collected
/// from command-line flags. Merge sources with [`PartialParams::or`], then
/// [`PartialParams::resolve`] into a validated [`Params`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialParams {
    pub icp_max_iterations: Option<u32>,
    pub voxel_size: Option<f32>,
    pub min_sample_distance: Option<f32>,
    pub sac_max_correspondence_distance: Option<f32>,
    pub icp_max_correspondence_distance: Option<f32>,
    pub sac_max_iterations: Option<u32>,
    pub normal_radius: Option<f32>,
    pub feature_radius: Option<f32>,
}

impl PartialParams {
    /// Load a partial parameter set from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Field-wise merge, preferring values from `self`.
    pub fn or(self, fallback: PartialParams) -> PartialParams {
        PartialParams {
            icp_max_iterations: self.icp_max_iterations.or(fallback.icp_max_iterations),
            voxel_size: self.voxel_size.or(fallback.voxel_size),
            min_sample_distance: self.min_sample_distance.or(fallback.min_sample_distance),
            sac_max_correspondence_distance: self
                .sac_max_correspondence_distance
                .or(fallback.sac_max_correspondence_distance),
            icp_max_correspondence_distance: self
                .icp_max_correspondence_distance
                .or(fallback.icp_max_correspondence_distance),
            sac_max_iterations: self.sac_max_iterations.or(fallback.sac_max_iterations),
            normal_radius: self.normal_radius.or(fallback.normal_radius),
            feature_radius: self.feature_radius.or(fallback.feature_radius),
        }
    }

    /// Require every field and validate the result.
    pub fn resolve(self) -> Result<Params, ConfigError> {
        fn require<T>(value: Option<T>, name: &'static str) -> Result<T, ConfigError> {
            value.ok_or(ConfigError::MissingParameter { name })
        }

        let params = Params {
            icp_max_iterations: require(self.icp_max_iterations, "icp_max_iterations")?,
            voxel_size: require(self.voxel_size, "voxel_size")?,
            min_sample_distance: require(self.min_sample_distance, "min_sample_distance")?,
            sac_max_correspondence_distance: require(
                self.sac_max_correspondence_distance,
                "sac_max_correspondence_distance",
            )?,
            icp_max_correspondence_distance: require(
                self.icp_max_correspondence_distance,
                "icp_max_correspondence_distance",
            )?,
            sac_max_iterations: require(self.sac_max_iterations, "sac_max_iterations")?,
            normal_radius: require(self.normal_radius, "normal_radius")?,
            feature_radius: require(self.feature_radius, "feature_radius")?,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn full_params() -> Params {
        Params {
            icp_max_iterations: 10,
            voxel_size: 0.05,
            min_sample_distance: 0.1,
            sac_max_correspondence_distance: 0.05,
            icp_max_correspondence_distance: 0.03,
            sac_max_iterations: 50,
            normal_radius: 0.3,
            feature_radius: 0.2,
        }
    }

    #[test]
    fn test_valid_params_pass() {
        assert!(full_params().validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let params = Params {
            icp_max_iterations: 0,
            ..full_params()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter {
                name: "icp_max_iterations",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_radius_rejected() {
        let params = Params {
            normal_radius: -0.3,
            ..full_params()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter {
                name: "normal_radius",
                ..
            })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let params = Params {
            voxel_size: f32::NAN,
            ..full_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_resolve_missing_field() {
        let partial = PartialParams {
            icp_max_iterations: Some(10),
            ..PartialParams::default()
        };
        assert!(matches!(
            partial.resolve(),
            Err(ConfigError::MissingParameter { name: "voxel_size" })
        ));
    }

    #[test]
    fn test_merge_prefers_self() {
        let cli = PartialParams {
            voxel_size: Some(0.1),
            ..PartialParams::default()
        };
        let file = PartialParams {
            voxel_size: Some(0.5),
            icp_max_iterations: Some(20),
            ..PartialParams::default()
        };
        let merged = cli.or(file);
        assert_eq!(merged.voxel_size, Some(0.1));
        assert_eq!(merged.icp_max_iterations, Some(20));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "icp_max_iterations = 10\n\
             voxel_size = 0.05\n\
             min_sample_distance = 0.1\n\
             sac_max_correspondence_distance = 0.05\n\
             icp_max_correspondence_distance = 0.03\n\
             sac_max_iterations = 50\n\
             normal_radius = 0.3\n\
             feature_radius = 0.2"
        )
        .unwrap();

        let partial = PartialParams::from_file(file.path()).unwrap();
        let params = partial.resolve().unwrap();
        assert_eq!(params, full_params());
    }

    #[test]
    fn test_from_file_rejects_unknown_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "voxel_sizee = 0.05").unwrap();
        assert!(matches!(
            PartialParams::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
