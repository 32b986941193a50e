use arucam::core::{CameraCalibration, MarkerQuad};
use arucam::PoseEstimator;
use nalgebra::Point2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 10 {
        eprintln!("Usage: estimate_pose <calibration.npz|json> <marker_length> x0 y0 x1 y1 x2 y2 x3 y3");
        return Ok(());
    }

    let calibration = CameraCalibration::load(&args[0])?;
    let marker_length: f64 = args[1].parse()?;
    let coords = args[2..]
        .iter()
        .map(|s| s.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    let points: Vec<Point2<f32>> = coords
        .chunks_exact(2)
        .map(|c| Point2::new(c[0], c[1]))
        .collect();
    let quad = MarkerQuad::from_slice(&points)?;

    let estimator = PoseEstimator::new(calibration, marker_length)?;
    let pose = estimator.estimate_single(&quad)?;
    println!("rvec: {:?}", pose.rvec.as_slice());
    println!("{}", pose.distance());

    Ok(())
}
