// crates/tilemix-core/src/lib.rs
//
// Pure mosaic data and algorithms — no threads, no FFmpeg, no egui.
// Serializable via serde. Used by both tilemix-media and tilemix-app.
//
// To add a new capability:
//   1. Create a new module file here
//   2. Add `pub mod mymodule;` below
//   3. Drive it from tilemix-media (scheduler.rs) or the app shell

pub mod audio;
pub mod blur;
pub mod commands;
pub mod frame;
pub mod media_types;
pub mod mosaic;
pub mod session;
