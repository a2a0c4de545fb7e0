//! Shared constants for end-to-end tests

pub const VENUE_ID: &str = "1001";
pub const VENUE_NAME: &str = "Madison Square Garden";

pub const SHOW_ID: &str = "1252";
pub const SHOW_DATE: &str = "2023-12-31";

pub const SONG_ID: &str = "77";
pub const SONG_NAME: &str = "Tweezer";

pub const SETLIST_ENTRY_ID: &str = "900001";
