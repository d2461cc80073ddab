//! Event names and request → response pairing.
//!
//! The backend answers each request with a differently-named event carrying
//! the same event id. [`response_event_for`] maps a request name to the name
//! its answer will arrive under.

/// Viewer registration (handshake request).
pub const REGISTER_VIEWER: &str = "REGISTER_VIEWER";
/// Handshake response.
pub const REGISTER_VIEWER_ACK: &str = "REGISTER_VIEWER_ACK";
/// Directory listing request.
pub const FILE_LIST_REQUEST: &str = "FILE_LIST_REQUEST";
/// Directory listing response.
pub const FILE_LIST_RESPONSE: &str = "FILE_LIST_RESPONSE";
/// Region file listing request.
pub const REGION_LIST_REQUEST: &str = "REGION_LIST_REQUEST";
/// Region file listing response.
pub const REGION_LIST_RESPONSE: &str = "REGION_LIST_RESPONSE";
/// File header/info request.
pub const FILE_INFO_REQUEST: &str = "FILE_INFO_REQUEST";
/// File header/info response.
pub const FILE_INFO_RESPONSE: &str = "FILE_INFO_RESPONSE";
/// Region file info request.
pub const REGION_FILE_INFO_REQUEST: &str = "REGION_FILE_INFO_REQUEST";
/// Region file info response.
pub const REGION_FILE_INFO_RESPONSE: &str = "REGION_FILE_INFO_RESPONSE";
/// Open an image file.
pub const OPEN_FILE: &str = "OPEN_FILE";
/// Open file acknowledgement.
pub const OPEN_FILE_ACK: &str = "OPEN_FILE_ACK";
/// Close an image file (no response).
pub const CLOSE_FILE: &str = "CLOSE_FILE";
/// Import regions from a file.
pub const IMPORT_REGION: &str = "IMPORT_REGION";
/// Import region acknowledgement.
pub const IMPORT_REGION_ACK: &str = "IMPORT_REGION_ACK";
/// Export regions to a file.
pub const EXPORT_REGION: &str = "EXPORT_REGION";
/// Export region acknowledgement.
pub const EXPORT_REGION_ACK: &str = "EXPORT_REGION_ACK";
/// Create or update a region.
pub const SET_REGION: &str = "SET_REGION";
/// Set region acknowledgement.
pub const SET_REGION_ACK: &str = "SET_REGION_ACK";
/// Remove a region (no response).
pub const REMOVE_REGION: &str = "REMOVE_REGION";
/// Start an animation.
pub const START_ANIMATION: &str = "START_ANIMATION";
/// Start animation acknowledgement.
pub const START_ANIMATION_ACK: &str = "START_ANIMATION_ACK";
/// Stop an animation (no response).
pub const STOP_ANIMATION: &str = "STOP_ANIMATION";
/// Update the visible image view (no response).
pub const SET_IMAGE_VIEW: &str = "SET_IMAGE_VIEW";
/// Move the cursor (no response).
pub const SET_CURSOR: &str = "SET_CURSOR";

/// Unsolicited raster image data.
pub const RASTER_IMAGE_DATA: &str = "RASTER_IMAGE_DATA";
/// Unsolicited raster tile data.
pub const RASTER_TILE_DATA: &str = "RASTER_TILE_DATA";
/// Unsolicited region histogram data.
pub const REGION_HISTOGRAM_DATA: &str = "REGION_HISTOGRAM_DATA";
/// Unsolicited spatial profile data.
pub const SPATIAL_PROFILE_DATA: &str = "SPATIAL_PROFILE_DATA";
/// Unsolicited spectral profile data.
pub const SPECTRAL_PROFILE_DATA: &str = "SPECTRAL_PROFILE_DATA";
/// Unsolicited region statistics.
pub const REGION_STATS_DATA: &str = "REGION_STATS_DATA";
/// Unsolicited contour data.
pub const CONTOUR_IMAGE_DATA: &str = "CONTOUR_IMAGE_DATA";
/// Backend-side error report.
pub const ERROR_DATA: &str = "ERROR_DATA";

/// Known request/response pairs whose names don't follow a suffix rule.
const KNOWN_PAIRS: &[(&str, &str)] = &[
    (REGISTER_VIEWER, REGISTER_VIEWER_ACK),
    (FILE_LIST_REQUEST, FILE_LIST_RESPONSE),
    (REGION_LIST_REQUEST, REGION_LIST_RESPONSE),
    (FILE_INFO_REQUEST, FILE_INFO_RESPONSE),
    (REGION_FILE_INFO_REQUEST, REGION_FILE_INFO_RESPONSE),
    (OPEN_FILE, OPEN_FILE_ACK),
    (IMPORT_REGION, IMPORT_REGION_ACK),
    (EXPORT_REGION, EXPORT_REGION_ACK),
    (SET_REGION, SET_REGION_ACK),
    (START_ANIMATION, START_ANIMATION_ACK),
];

/// Name of the event the backend answers `request` with.
///
/// Known pairs come from a fixed table. Otherwise `FOO_REQUEST` pairs with
/// `FOO_RESPONSE` and anything else with `FOO_ACK`.
pub fn response_event_for(request: &str) -> String {
    if let Some((_, response)) = KNOWN_PAIRS.iter().find(|(req, _)| *req == request) {
        return (*response).to_string();
    }
    match request.strip_suffix("_REQUEST") {
        Some(stem) => format!("{stem}_RESPONSE"),
        None => format!("{request}_ACK"),
    }
}
