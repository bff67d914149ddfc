use std::{sync::Arc, time::Duration};

use tracing::{error, info};

use crate::{
    common::{Item, ItemAction},
    config::{ConfigBuilder, ConfigError},
    utils::clipboard,
};

use self::{
    bookmark::{ACTION_ARCHIVE, ACTION_COPY, ACTION_DELETE, ACTION_OPEN},
    client::{LinkdingClient, Settings},
    indexer::Indexer,
    scheduler::RefreshScheduler,
};

use super::{Plugin, PluginContext, PluginError};

mod bookmark;
mod client;
mod indexer;
mod scheduler;

pub const PLUGIN_NAME: &str = "linkding";
const DEFAULT_INSTANCE_URL: &str = "http://localhost:9090";
const DEFAULT_CACHE_LENGTH: i64 = 15;
/// A year, in minutes.
const MAX_CACHE_LENGTH: i64 = 60 * 24 * 365;
const DEFAULT_TRIGGER: &str = "ld ";
const DEFAULT_LIST_LENGTH: usize = 10;

const SYNOPSIS_ITEM: &str = "synopsis";
const REFRESH_ITEM: &str = "refresh";
const ACTION_REFRESH: &str = "refresh";

#[derive(Debug, Clone, PartialEq)]
struct LinkdingConfig {
    settings: Settings,
    /// minutes, between one and `MAX_CACHE_LENGTH`
    cache_length: u64,
    trigger: String,
    list_length: usize,
}

impl Default for LinkdingConfig {
    fn default() -> Self {
        Self {
            settings: Settings {
                instance_url: DEFAULT_INSTANCE_URL.into(),
                api_key: String::new(),
            },
            cache_length: DEFAULT_CACHE_LENGTH as u64,
            trigger: DEFAULT_TRIGGER.into(),
            list_length: DEFAULT_LIST_LENGTH,
        }
    }
}

fn clamp_cache_length(minutes: i64) -> u64 {
    minutes.clamp(1, MAX_CACHE_LENGTH) as u64
}

fn cache_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

pub struct Linkding {
    config: LinkdingConfig,
    indexer: Arc<Indexer>,
    scheduler: Option<RefreshScheduler>,
}

impl Linkding {
    pub fn new() -> Self {
        let config = LinkdingConfig::default();
        Self {
            indexer: Arc::new(Indexer::new(LinkdingClient::new(config.settings.clone()))),
            config,
            scheduler: None,
        }
    }

    /// Tears down the running loop, if any, and starts a new one.
    fn restart_scheduler(&mut self, refresh_first: bool) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }

        let indexer = Arc::clone(&self.indexer);
        let interval = cache_interval(self.config.cache_length);
        match RefreshScheduler::start(interval, refresh_first, move || {
            indexer.update_index_items()
        }) {
            Ok(scheduler) => self.scheduler = Some(scheduler),
            Err(err) => error!("Could not start the refresh thread: {err}"),
        }
    }

    fn apply(&mut self, config: LinkdingConfig) {
        let settings_changed = config.settings != self.config.settings;
        let interval_changed = config.cache_length != self.config.cache_length;
        if settings_changed {
            self.indexer
                .set_client(LinkdingClient::new(config.settings.clone()));
        }
        self.config = config;

        if self.scheduler.is_none() || settings_changed {
            self.restart_scheduler(true);
        } else if interval_changed {
            info!("Cache length is now {} minutes", self.config.cache_length);
            self.restart_scheduler(false);
        }
    }

    fn meta_items(&self) -> [Item; 2] {
        [
            Item {
                id: SYNOPSIS_ITEM.into(),
                text: "Linkding".into(),
                subtext: format!(
                    "Search for a bookmark saved via linkding ({} indexed)",
                    self.indexer.len()
                ),
                actions: Vec::new(),
            },
            Item {
                id: REFRESH_ITEM.into(),
                text: "Refresh cache".into(),
                subtext: "Refresh cached bookmarks".into(),
                actions: vec![ItemAction::new(ACTION_REFRESH, "Refresh bookmark cache")],
            },
        ]
    }
}

impl Plugin for Linkding {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn search(&mut self, ctx: &mut PluginContext<'_>) {
        let Some(keyword) = ctx.query.strip_prefix(self.config.trigger.as_str()) else {
            return;
        };

        let keyword = keyword.trim();
        if keyword.is_empty() {
            for item in self.meta_items() {
                ctx.add(item);
            }
        } else {
            for item in self.indexer.find(keyword, self.config.list_length) {
                ctx.add(item);
            }
        }
        ctx.break_flow();
    }

    fn activate(&mut self, item: &str, action: &str) -> Result<(), PluginError> {
        if item == REFRESH_ITEM && action == ACTION_REFRESH {
            self.refresh();
            return Ok(());
        }

        let bookmark = self
            .indexer
            .bookmark(item)
            .ok_or_else(|| PluginError::UnknownItem(item.into()))?;

        match action {
            ACTION_OPEN => open::that(&bookmark.url)
                .map_err(|err| PluginError::Failed(format!("could not open {}: {err}", bookmark.url))),
            ACTION_COPY => clipboard::copy_to_clipboard(&bookmark.url)
                .map_err(|err| PluginError::Failed(err.to_string())),
            ACTION_ARCHIVE => {
                self.indexer.mutate(|client| client.archive(bookmark.id));
                Ok(())
            }
            ACTION_DELETE => {
                self.indexer.mutate(|client| client.delete(bookmark.id));
                Ok(())
            }
            _ => Err(PluginError::UnknownAction {
                item: item.into(),
                action: action.into(),
            }),
        }
    }

    fn refresh(&mut self) {
        self.indexer.update_index_items();
    }

    fn configure(&mut self, mut builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError> {
        let mut config = LinkdingConfig::default();
        builder.group("linkding_plugin", |builder| {
            config.settings.instance_url =
                builder.get_or_create("instance_url", DEFAULT_INSTANCE_URL.to_string())?;
            config.settings.api_key = builder.get_or_create("api_key", String::new())?;

            let cache_length = builder.get_or_create("cache_length", DEFAULT_CACHE_LENGTH)?;
            config.cache_length = clamp_cache_length(cache_length);
            builder.put("cache_length", config.cache_length);

            config.trigger = builder.get_or_create("trigger", DEFAULT_TRIGGER.to_string())?;
            config.list_length = builder.get_or_create("list_length", DEFAULT_LIST_LENGTH)?;
            Ok(())
        })?;

        self.apply(config);
        Ok(builder)
    }

    fn finalize(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }
}
