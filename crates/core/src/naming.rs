//! Output filename conventions.
//!
//! Convention: `processed_image_{epoch_ms}[_{variant}].{ext}`.

use crate::job::OutputVariant;
use crate::types::Timestamp;

/// Extension used for every generated output.
pub const OUTPUT_EXTENSION: &str = "png";

/// Filename for a downloaded output.
///
/// ```
/// use chrono::TimeZone;
/// use studiostyle_core::naming::output_filename;
///
/// let now = chrono::Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// assert_eq!(output_filename(now, "png"), "processed_image_1700000000000.png");
/// ```
pub fn output_filename(now: Timestamp, ext: &str) -> String {
    format!("processed_image_{}.{ext}", now.timestamp_millis())
}

/// Filename qualified by variant, so both outputs of one export differ.
pub fn variant_filename(now: Timestamp, variant: OutputVariant, ext: &str) -> String {
    format!(
        "processed_image_{}_{}.{ext}",
        now.timestamp_millis(),
        variant.slug()
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn variant_names_do_not_collide() {
        let now = chrono::Utc.timestamp_millis_opt(42).unwrap();
        let a = variant_filename(now, OutputVariant::Transparent, OUTPUT_EXTENSION);
        let b = variant_filename(now, OutputVariant::WhiteBackground, OUTPUT_EXTENSION);
        assert_eq!(a, "processed_image_42_transparent.png");
        assert_eq!(b, "processed_image_42_white_bg.png");
    }
}
