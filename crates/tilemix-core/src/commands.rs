// crates/tilemix-core/src/commands.rs
//
// Every user action in TileMix is expressed as an EngineCommand.
// UI widgets and hotkeys emit these; the app shell processes them after the
// UI pass. Adding a control = add a variant here + one match arm in app.rs.

use std::path::PathBuf;

use crate::session::NavDirection;

#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Load the given files into the session. Probing and audio extraction
    /// happen on background loader threads; clips appear as results arrive.
    LoadClips(Vec<PathBuf>),
    /// Start playback: arm the periodic video redraw and launch the audio
    /// shuffle loop over the combined audio of every loaded clip.
    Start,
    /// Stop the audio loop and silence the output immediately. Harmless when
    /// nothing is playing.
    StopAudio,
    /// Disarm the periodic video redraw, freezing the canvas.
    StopVideo,
    /// Move the playback cursor and redraw at once, without waiting for the
    /// next periodic tick.
    Navigate(NavDirection),
}
