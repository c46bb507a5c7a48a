//! Library (catalog) events.

use uuid::Uuid;

use crate::entities::media::PickedFile;

/// Append files to the library without playing them
#[derive(Clone, Debug)]
pub struct AddFilesEvent(pub Vec<PickedFile>);

/// Add a file and play it right away
#[derive(Clone, Debug)]
pub struct OpenFileEvent(pub PickedFile);

/// Load an existing library entry into the player
#[derive(Clone, Debug)]
pub struct PlayEntryEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct RemoveEntryEvent(pub Uuid);
