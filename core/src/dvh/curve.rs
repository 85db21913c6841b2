use crate::error::{DosePoliceError, Result};
use crate::types::VolumeUnit;

/// Rounds to one decimal place
///
/// Every measured dose or volume leaving the evaluation engine goes
/// through this, so reports and comparisons agree on the same value.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Cumulative dose-volume curve of one structure
///
/// `cumulative_volume_axis[i]` is the volume receiving at least
/// `dose_axis[i]`. The dose axis is non-decreasing and the volume axis
/// non-increasing; both are checked on construction and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseVolumeCurve {
    dose_axis: Vec<f64>,
    cumulative_volume_axis: Vec<f64>,
    differential_volume_axis: Vec<f64>,
    unit: VolumeUnit,
}

impl DoseVolumeCurve {
    /// Builds a curve from raw dose/volume columns
    ///
    /// # Errors
    ///
    /// Returns [`DosePoliceError::MalformedCurve`] if:
    /// - the axes are empty or of different lengths
    /// - any value is not finite, or a dose is negative
    /// - doses decrease or cumulative volumes increase along the axis
    pub fn new(
        dose_axis: Vec<f64>,
        cumulative_volume_axis: Vec<f64>,
        unit: VolumeUnit,
    ) -> Result<Self> {
        if dose_axis.is_empty() {
            return Err(DosePoliceError::MalformedCurve("empty axes".to_string()));
        }
        if dose_axis.len() != cumulative_volume_axis.len() {
            return Err(DosePoliceError::MalformedCurve(format!(
                "dose axis has {} points, volume axis has {}",
                dose_axis.len(),
                cumulative_volume_axis.len()
            )));
        }
        if let Some(v) = dose_axis
            .iter()
            .chain(cumulative_volume_axis.iter())
            .find(|v| !v.is_finite())
        {
            return Err(DosePoliceError::MalformedCurve(format!(
                "non-finite value {}",
                v
            )));
        }
        if dose_axis[0] < 0.0 {
            return Err(DosePoliceError::MalformedCurve(format!(
                "negative dose {}",
                dose_axis[0]
            )));
        }
        if let Some(i) = dose_axis.windows(2).position(|w| w[1] < w[0]) {
            return Err(DosePoliceError::MalformedCurve(format!(
                "dose decreases from {} to {} at point {}",
                dose_axis[i],
                dose_axis[i + 1],
                i + 1
            )));
        }
        if let Some(i) = cumulative_volume_axis
            .windows(2)
            .position(|w| w[1] > w[0])
        {
            return Err(DosePoliceError::MalformedCurve(format!(
                "cumulative volume increases from {} to {} at point {}",
                cumulative_volume_axis[i],
                cumulative_volume_axis[i + 1],
                i + 1
            )));
        }

        // Volume inside each dose bin; the last bin has no upper neighbour
        let mut differential_volume_axis: Vec<f64> = cumulative_volume_axis
            .windows(2)
            .map(|w| w[0] - w[1])
            .collect();
        differential_volume_axis.push(0.0);

        Ok(Self {
            dose_axis,
            cumulative_volume_axis,
            differential_volume_axis,
            unit,
        })
    }

    pub fn dose_axis(&self) -> &[f64] {
        &self.dose_axis
    }

    pub fn cumulative_volume_axis(&self) -> &[f64] {
        &self.cumulative_volume_axis
    }

    pub fn differential_volume_axis(&self) -> &[f64] {
        &self.differential_volume_axis
    }

    /// Unit of the volume axis
    pub fn unit(&self) -> VolumeUnit {
        self.unit
    }

    /// Volume at the lowest dose, the structure's total volume reference
    pub fn total_volume(&self) -> f64 {
        self.cumulative_volume_axis[0]
    }

    /// Number of points on the curve
    pub fn len(&self) -> usize {
        self.dose_axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dose_axis.is_empty()
    }

    /// Volume receiving at least `dose`, in the curve's unit
    ///
    /// Linear interpolation between points; doses outside the axis
    /// clamp to the first or last volume. Rounded to one decimal.
    pub fn volume_at(&self, dose: f64) -> f64 {
        round_tenth(interpolate(
            self.dose_axis.iter().copied(),
            self.cumulative_volume_axis.iter().copied(),
            dose,
        ))
    }

    /// Dose received by `volume` (in the curve's unit)
    ///
    /// Interpolates the inverted curve; the volume axis is traversed in
    /// reverse so it is non-decreasing. Volumes outside the axis clamp to
    /// the dose at the nearest end. Rounded to one decimal.
    pub fn dose_at(&self, volume: f64) -> f64 {
        round_tenth(interpolate(
            self.cumulative_volume_axis.iter().rev().copied(),
            self.dose_axis.iter().rev().copied(),
            volume,
        ))
    }
}

/// Piecewise-linear interpolation over a non-decreasing `xs`
///
/// Queries outside `[xs[0], xs[n-1]]` return the endpoint value. A NaN
/// query yields NaN.
fn interpolate(
    xs: impl Iterator<Item = f64>,
    ys: impl Iterator<Item = f64>,
    x: f64,
) -> f64 {
    let points: Vec<(f64, f64)> = xs.zip(ys).collect();
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return f64::NAN;
    };
    if x.is_nan() {
        return f64::NAN;
    }

    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }

    // first.0 < x < last.0, so 1 <= idx < len
    let idx = points.partition_point(|p| p.0 < x);
    let (x0, y0) = points[idx - 1];
    let (x1, y1) = points[idx];
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}
