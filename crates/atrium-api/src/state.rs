use std::path::PathBuf;
use std::sync::Arc;

use atrium_roster::{Divisions, Roster};
use atrium_store::Store;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub roster: Roster,
    pub divisions: Divisions,
    /// Directory holding the three static datasets, re-read per request
    /// by the dataset endpoints.
    pub data_dir: PathBuf,
}
