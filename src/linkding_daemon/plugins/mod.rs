use thiserror::Error;
use tracing::debug;

use crate::{
    common::{Hit, Item},
    config::{ConfigBuilder, ConfigError},
};

pub mod index;
#[cfg(feature = "linkding_plugin")]
mod linkding;

pub enum PluginFlowControl {
    /// check other plugins as well
    Continue,

    /// don't check other plugins
    Break,
}

/// What a plugin gets while handling a query.
pub struct PluginContext<'a> {
    pub query: &'a str,
    plugin: &'static str,
    hits: Vec<Hit>,
    flow: PluginFlowControl,
}

impl<'a> PluginContext<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            plugin: "",
            hits: Vec::new(),
            flow: PluginFlowControl::Continue,
        }
    }

    pub fn add(&mut self, item: Item) {
        self.hits.push(Hit {
            plugin: self.plugin.into(),
            item,
        });
    }

    pub fn break_flow(&mut self) {
        self.flow = PluginFlowControl::Break;
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("no plugin named {0}")]
    UnknownPlugin(String),
    #[error("unknown item {0}")]
    UnknownItem(String),
    #[error("unknown action {action} for item {item}")]
    UnknownAction { item: String, action: String },
    #[error("{0}")]
    Failed(String),
}

pub trait Plugin {
    fn name(&self) -> &'static str;

    fn search(&mut self, ctx: &mut PluginContext<'_>);

    fn activate(&mut self, item: &str, action: &str) -> Result<(), PluginError>;

    /// Rebuilds whatever the plugin caches.
    fn refresh(&mut self) {}

    fn configure(&mut self, builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError>;

    fn finalize(&mut self) {}
}

pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::with_plugins(vec![
            #[cfg(feature = "linkding_plugin")]
            Box::new(linkding::Linkding::new()),
        ])
    }

    pub fn with_plugins(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn search(&mut self, query: &str) -> Vec<Hit> {
        let mut ctx = PluginContext::new(query);
        for plugin in &mut self.plugins {
            ctx.plugin = plugin.name();
            plugin.search(&mut ctx);
            if let PluginFlowControl::Break = ctx.flow {
                debug!("{} handled {query:?}", plugin.name());
                break;
            }
        }
        ctx.hits
    }

    pub fn activate(&mut self, plugin: &str, item: &str, action: &str) -> Result<(), PluginError> {
        self.plugins
            .iter_mut()
            .find(|p| p.name() == plugin)
            .ok_or_else(|| PluginError::UnknownPlugin(plugin.into()))?
            .activate(item, action)
    }

    pub fn refresh(&mut self) {
        for plugin in &mut self.plugins {
            plugin.refresh();
        }
    }

    pub fn configure(&mut self, mut builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError> {
        for plugin in &mut self.plugins {
            builder = plugin.configure(builder)?;
        }
        Ok(builder)
    }

    pub fn finalize(&mut self) {
        for plugin in &mut self.plugins {
            plugin.finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ItemAction;

    struct Echo {
        name: &'static str,
        stop: bool,
        activated: Vec<(String, String)>,
    }

    impl Plugin for Echo {
        fn name(&self) -> &'static str {
            self.name
        }

        fn search(&mut self, ctx: &mut PluginContext<'_>) {
            ctx.add(Item {
                id: ctx.query.into(),
                text: self.name.into(),
                subtext: String::new(),
                actions: vec![ItemAction::new("run", "Run")],
            });
            if self.stop {
                ctx.break_flow();
            }
        }

        fn activate(&mut self, item: &str, action: &str) -> Result<(), PluginError> {
            self.activated.push((item.into(), action.into()));
            Ok(())
        }

        fn configure(&mut self, builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError> {
            Ok(builder)
        }
    }

    fn echo(name: &'static str, stop: bool) -> Box<dyn Plugin> {
        Box::new(Echo {
            name,
            stop,
            activated: Vec::new(),
        })
    }

    #[test]
    fn break_stops_later_plugins() {
        let mut manager = PluginManager::with_plugins(vec![
            echo("first", false),
            echo("second", true),
            echo("third", false),
        ]);
        let hits = manager.search("q");
        let plugins: Vec<&str> = hits.iter().map(|h| h.plugin.as_str()).collect();
        assert_eq!(plugins, vec!["first", "second"]);
        assert_eq!(hits[0].item.id, "q");
    }

    #[test]
    fn activation_is_routed_by_plugin_name() {
        let mut manager = PluginManager::with_plugins(vec![echo("first", false)]);
        manager.activate("first", "1", "run").unwrap();
        assert!(matches!(
            manager.activate("missing", "1", "run"),
            Err(PluginError::UnknownPlugin(name)) if name == "missing"
        ));
    }
}
