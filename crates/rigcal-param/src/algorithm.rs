//! Tuning parameters of the feature detector and tracker.
//!
//! Every field has a default and documents may omit any of them. The native
//! layout nests the fields under `FeatDetParam:` and `Tracking:`; the legacy
//! layout uses flat `FeatDetParam.<field>` keys with integer flags.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    cv::{CvReader, CvWriter},
    document::{parse_native, Dialect},
    error::ParamError,
    param::ParamBase,
};

/// How features are propagated to the slave (right) image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlaveDet {
    /// Direct image alignment.
    #[default]
    #[serde(rename = "direct")]
    Direct,
    /// Pyramidal optical flow.
    #[serde(rename = "OF")]
    OpticalFlow,
    /// Descriptor matching against detections in the slave image.
    #[serde(rename = "DESC")]
    Descriptor,
}

impl SlaveDet {
    /// The name used in parameter documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaveDet::Direct => "direct",
            SlaveDet::OpticalFlow => "OF",
            SlaveDet::Descriptor => "DESC",
        }
    }
}

impl std::fmt::Display for SlaveDet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlaveDet {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(SlaveDet::Direct),
            "OF" => Ok(SlaveDet::OpticalFlow),
            "DESC" => Ok(SlaveDet::Descriptor),
            other => Err(ParamError::MalformedDocument(format!(
                "unknown slave_det mode: {other}"
            ))),
        }
    }
}

/// Feature detection tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatDetParam {
    /// Requested number of features per image.
    pub request_feat_num: i32,
    /// Number of pyramid levels.
    pub pyra_level: i32,
    /// FAST detector threshold.
    pub fast_det_thresh: i32,
    /// Radius enforcing a uniform spatial distribution of features.
    pub uniform_radius: i32,
    /// Minimum feature distance over stereo baseline.
    pub min_feature_distance_over_baseline_ratio: f32,
    /// Maximum feature distance over stereo baseline.
    pub max_feature_distance_over_baseline_ratio: f32,
    /// Track length after which a feature may be dropped.
    pub feature_track_length_thresh: i32,
    /// Fraction of long tracks dropped per frame.
    pub feature_track_dropout_rate: f32,
}

impl Default for FeatDetParam {
    fn default() -> Self {
        Self {
            request_feat_num: 70,
            pyra_level: 2,
            fast_det_thresh: 10,
            uniform_radius: 40,
            min_feature_distance_over_baseline_ratio: 3.0,
            max_feature_distance_over_baseline_ratio: 3000.0,
            feature_track_length_thresh: 25,
            feature_track_dropout_rate: 0.3,
        }
    }
}

/// Tracking and imaging tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracking {
    /// Search range as a fraction of the image width.
    pub max_feature_search_range: f32,
    /// Maximum ORB descriptor distance of a match.
    pub orb_match_dist_thresh: f32,
    /// Ratio test threshold between the best and second best match.
    pub orb_match_thresh_test_ratio: f32,
    /// Feature position uncertainty in pixels.
    pub feature_uncertainty: f32,
    /// Imaging frame rate.
    #[serde(rename = "imaging_FPS")]
    pub imaging_fps: i32,
    /// Exposure setting.
    pub imaging_exposure: i32,
    /// Gain setting.
    pub imaging_gain: i32,
    /// Auto exposure table index.
    pub aec_index: i32,
    /// Use optical flow ids.
    pub use_of_id: bool,
    /// Detect april tags.
    pub use_april_tag: bool,
    /// Slave image propagation mode.
    pub slave_det: SlaveDet,
    /// Undistort features before visual-inertial fusion.
    pub undistort_before_vio: bool,
}

impl Default for Tracking {
    fn default() -> Self {
        Self {
            max_feature_search_range: 10.0 / 400.0,
            orb_match_dist_thresh: 0.3 * 255.0,
            orb_match_thresh_test_ratio: 0.9,
            feature_uncertainty: 5.0,
            imaging_fps: 20,
            imaging_exposure: 100,
            imaging_gain: 100,
            aec_index: 100,
            use_of_id: true,
            use_april_tag: false,
            slave_det: SlaveDet::Direct,
            undistort_before_vio: true,
        }
    }
}

/// Feature detection and tracking parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmParam {
    /// Feature detection tuning.
    #[serde(rename = "FeatDetParam")]
    pub feat_det: FeatDetParam,
    /// Tracking tuning.
    #[serde(rename = "Tracking")]
    pub tracking: Tracking,
}

impl ParamBase for AlgorithmParam {
    fn from_document(text: &str, dialect: Dialect) -> Result<Self, ParamError> {
        match dialect {
            Dialect::Native => match parse_native(text)? {
                serde_yaml::Value::Null => Ok(Self::default()),
                value => Ok(serde_yaml::from_value(value)?),
            },
            Dialect::LegacyCv => Self::from_cv(&CvReader::parse(text)?),
        }
    }

    fn to_document(&self, dialect: Dialect) -> Result<String, ParamError> {
        match dialect {
            Dialect::Native => Ok(serde_yaml::to_string(self)?),
            Dialect::LegacyCv => {
                let mut writer = CvWriter::new();
                self.write_cv(&mut writer);
                writer.finish()
            }
        }
    }
}

impl AlgorithmParam {
    fn from_cv(doc: &CvReader) -> Result<Self, ParamError> {
        let mut param = Self::default();

        macro_rules! read {
            ($getter:ident, $key:literal, $field:expr) => {
                if let Some(v) = doc.$getter($key)? {
                    $field = v;
                }
            };
        }

        let f = &mut param.feat_det;
        read!(opt_i32, "FeatDetParam.request_feat_num", f.request_feat_num);
        read!(opt_i32, "FeatDetParam.pyra_level", f.pyra_level);
        read!(opt_i32, "FeatDetParam.fast_det_thresh", f.fast_det_thresh);
        read!(opt_i32, "FeatDetParam.uniform_radius", f.uniform_radius);
        read!(
            opt_f32,
            "FeatDetParam.min_feature_distance_over_baseline_ratio",
            f.min_feature_distance_over_baseline_ratio
        );
        read!(
            opt_f32,
            "FeatDetParam.max_feature_distance_over_baseline_ratio",
            f.max_feature_distance_over_baseline_ratio
        );
        read!(
            opt_i32,
            "FeatDetParam.feature_track_length_thresh",
            f.feature_track_length_thresh
        );
        read!(
            opt_f32,
            "FeatDetParam.feature_track_dropout_rate",
            f.feature_track_dropout_rate
        );

        let t = &mut param.tracking;
        read!(opt_f32, "Tracking.max_feature_search_range", t.max_feature_search_range);
        read!(opt_f32, "Tracking.orb_match_dist_thresh", t.orb_match_dist_thresh);
        read!(
            opt_f32,
            "Tracking.orb_match_thresh_test_ratio",
            t.orb_match_thresh_test_ratio
        );
        read!(opt_f32, "Tracking.feature_uncertainty", t.feature_uncertainty);
        read!(opt_i32, "Tracking.imaging_FPS", t.imaging_fps);
        read!(opt_i32, "Tracking.imaging_exposure", t.imaging_exposure);
        read!(opt_i32, "Tracking.imaging_gain", t.imaging_gain);
        read!(opt_i32, "Tracking.aec_index", t.aec_index);
        if let Some(v) = doc.opt_bool("Tracking.use_of_id")? {
            t.use_of_id = v;
        }
        if let Some(v) = doc.opt_bool("Tracking.use_april_tag")? {
            t.use_april_tag = v;
        }
        if let Some(v) = doc.opt_str("Tracking.slave_det")? {
            t.slave_det = v.parse()?;
        }
        if let Some(v) = doc.opt_bool("Tracking.undistort_before_vio")? {
            t.undistort_before_vio = v;
        }

        Ok(param)
    }

    fn write_cv(&self, w: &mut CvWriter) {
        let f = &self.feat_det;
        w.scalar("FeatDetParam.request_feat_num", i64::from(f.request_feat_num));
        w.scalar("FeatDetParam.pyra_level", i64::from(f.pyra_level));
        w.scalar("FeatDetParam.fast_det_thresh", i64::from(f.fast_det_thresh));
        w.scalar("FeatDetParam.uniform_radius", i64::from(f.uniform_radius));
        w.scalar(
            "FeatDetParam.min_feature_distance_over_baseline_ratio",
            f.min_feature_distance_over_baseline_ratio,
        );
        w.scalar(
            "FeatDetParam.max_feature_distance_over_baseline_ratio",
            f.max_feature_distance_over_baseline_ratio,
        );
        w.scalar(
            "FeatDetParam.feature_track_length_thresh",
            i64::from(f.feature_track_length_thresh),
        );
        w.scalar(
            "FeatDetParam.feature_track_dropout_rate",
            f.feature_track_dropout_rate,
        );

        let t = &self.tracking;
        w.scalar("Tracking.max_feature_search_range", t.max_feature_search_range);
        w.scalar("Tracking.orb_match_dist_thresh", t.orb_match_dist_thresh);
        w.scalar(
            "Tracking.orb_match_thresh_test_ratio",
            t.orb_match_thresh_test_ratio,
        );
        w.scalar("Tracking.feature_uncertainty", t.feature_uncertainty);
        w.scalar("Tracking.imaging_FPS", i64::from(t.imaging_fps));
        w.scalar("Tracking.imaging_exposure", i64::from(t.imaging_exposure));
        w.scalar("Tracking.imaging_gain", i64::from(t.imaging_gain));
        w.scalar("Tracking.aec_index", i64::from(t.aec_index));
        w.flag("Tracking.use_of_id", t.use_of_id);
        w.flag("Tracking.use_april_tag", t.use_april_tag);
        w.scalar("Tracking.slave_det", t.slave_det.as_str());
        w.flag("Tracking.undistort_before_vio", t.undistort_before_vio);
    }
}
