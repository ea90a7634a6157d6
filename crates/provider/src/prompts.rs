//! Fixed instructions sent with every request.

/// Transparent-background extraction.
pub const REMOVE_BACKGROUND: &str = "Please remove the background from this image accurately. \
Detect complex edges like hair, fabric, or transparent objects. The output should be a clean PNG \
with a true transparent background, preserving all details, textures, colors, and sharpness of \
the main subject. Do not add any shadows or enhancements.";

/// Studio white background with lighting correction and a soft shadow.
pub const STUDIO_WHITE_BACKGROUND: &str = "Take this image of a subject and place it on a clean, \
solid white background (#FFFFFF). Enhance the image to studio quality by correcting the lighting, \
balancing contrast and brightness, and adding a natural, soft drop shadow beneath the subject to \
give it depth. Preserve all original details, textures, and colors of the subject.";
