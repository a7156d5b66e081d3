use argh::FromArgs;
use std::path::PathBuf;

use rigcal::image::ImageSize;
use rigcal::param::{load_camera_calib_param, DuoCalibParam, ParamBase};

#[derive(FromArgs)]
/// Derive the stereo rectification of a calibration file and save the result
struct Args {
    /// path to the calibration file (native or legacy)
    #[argh(option)]
    calib: PathBuf,

    /// width of the rectified images, defaults to the calibrated width
    #[argh(option)]
    width: Option<usize>,

    /// height of the rectified images, defaults to the calibrated height
    #[argh(option)]
    height: Option<usize>,

    /// path to write the rectified calibration to
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// write the legacy OpenCV layout instead of the native one
    #[argh(switch)]
    legacy: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut calib = DuoCalibParam::default();
    load_camera_calib_param(&args.calib, &mut calib)?;

    let size = ImageSize {
        width: args.width.unwrap_or(calib.camera.img_size.width),
        height: args.height.unwrap_or(calib.camera.img_size.height),
    };
    calib.init_undistort_map(size)?;

    if let Some(rect) = calib.rectification() {
        log::info!("Q: {:?}", rect.q.to_cols_array_2d());
        for (i, eye) in rect.eyes.iter().enumerate() {
            log::info!("eye {i} rectified K: {:?}", eye.undist_k.to_cols_array_2d());
        }
    }

    if let Some(output) = args.output {
        if args.legacy {
            calib.write_to_cv_yaml(&output)?;
        } else {
            calib.write_to_yaml(&output)?;
        }
        log::info!("wrote {}", output.display());
    }

    Ok(())
}
