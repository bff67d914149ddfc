use std::{
    ffi::OsString,
    fs, io,
    path::Path,
};

use inotify::{EventMask, Inotify, WatchMask};
use tracing::{debug, warn};

/// Watches the directory of the config file, because editors usually replace
/// the file instead of modifying it in place.
pub struct Watcher {
    inotify: Inotify,
    file_name: OsString,
    buffer: [u8; 4096],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    Created,
    Deleted,
    Modified,
}

impl Watcher {
    pub fn new(config_file: &Path) -> io::Result<Self> {
        let (Some(dir), Some(file_name)) = (config_file.parent(), config_file.file_name()) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file path", config_file.display()),
            ));
        };
        fs::create_dir_all(dir)?;

        let inotify = Inotify::init()?;
        inotify.watches().add(
            dir,
            WatchMask::CLOSE_WRITE
                | WatchMask::CREATE
                | WatchMask::DELETE
                | WatchMask::MOVED_TO
                | WatchMask::MOVED_FROM,
        )?;
        debug!("Watching {} for config changes", dir.display());

        Ok(Self {
            inotify,
            file_name: file_name.to_os_string(),
            buffer: [0; 4096],
        })
    }

    /// Blocks until the next batch of events arrives. Ends when inotify fails.
    pub fn get_stream(&mut self) -> impl Iterator<Item = ConfigEvent> + '_ {
        std::iter::from_fn(move || {
            let events = match self.inotify.read_events_blocking(&mut self.buffer) {
                Ok(events) => events,
                Err(err) => {
                    warn!("Stopped watching config: {err}");
                    return None;
                }
            };

            let file_name = &self.file_name;
            Some(
                events
                    .filter(|event| event.name.is_some_and(|name| name == file_name.as_os_str()))
                    .filter_map(|event| to_config_event(event.mask))
                    .collect::<Vec<_>>(),
            )
        })
        .flatten()
    }
}

fn to_config_event(mask: EventMask) -> Option<ConfigEvent> {
    if mask.contains(EventMask::CREATE) || mask.contains(EventMask::MOVED_TO) {
        Some(ConfigEvent::Created)
    } else if mask.contains(EventMask::DELETE) || mask.contains(EventMask::MOVED_FROM) {
        Some(ConfigEvent::Deleted)
    } else if mask.contains(EventMask::CLOSE_WRITE) {
        Some(ConfigEvent::Modified)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_event_masks() {
        assert_eq!(to_config_event(EventMask::MOVED_TO), Some(ConfigEvent::Created));
        assert_eq!(to_config_event(EventMask::DELETE), Some(ConfigEvent::Deleted));
        assert_eq!(
            to_config_event(EventMask::CLOSE_WRITE),
            Some(ConfigEvent::Modified)
        );
        assert_eq!(to_config_event(EventMask::ACCESS), None);
    }

    #[test]
    fn reports_writes_to_the_watched_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");
        let mut watcher = Watcher::new(&config_file).unwrap();

        fs::write(dir.path().join("other.toml"), "a = 1").unwrap();
        fs::write(&config_file, "a = 1").unwrap();

        let event = watcher.get_stream().next();
        assert_eq!(event, Some(ConfigEvent::Created));
    }
}
