use tracing::{debug, error, info};

use crate::{
    common::{Command, ConfigValue, Reply},
    config::{ConfigBuilder, ConfigError},
    plugins::PluginManager,
};

pub struct App {
    plugin_manager: PluginManager,
    config: Option<ConfigBuilder>,
    quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self::with_plugin_manager(PluginManager::new())
    }

    pub fn with_plugin_manager(plugin_manager: PluginManager) -> Self {
        Self {
            plugin_manager,
            config: None,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Loads the config file, lets every plugin read it and writes back the
    /// defaults they added. On a broken file the previous configuration stays.
    pub fn reload_config(&mut self) -> Result<(), ConfigError> {
        let builder = match &self.config {
            Some(current) => ConfigBuilder::load(current.path())?,
            None => ConfigBuilder::new()?,
        };
        self.configure(builder)
    }

    pub fn configure(&mut self, builder: ConfigBuilder) -> Result<(), ConfigError> {
        let mut builder = self.plugin_manager.configure(builder)?;
        builder.save()?;
        debug!("Configured from {}", builder.path().display());
        self.config = Some(builder);
        Ok(())
    }

    pub fn handle(&mut self, command: Command) -> Reply {
        match command {
            Command::Query { query } => Reply::Hits(self.plugin_manager.search(&query)),
            Command::Activate {
                plugin,
                item,
                action,
            } => match self.plugin_manager.activate(&plugin, &item, &action) {
                Ok(()) => Reply::Done,
                Err(err) => Reply::Failed(err.to_string()),
            },
            Command::Refresh => {
                self.plugin_manager.refresh();
                Reply::Done
            }
            Command::Set { key, value } => match self.set(&key, value) {
                Ok(()) => Reply::Done,
                Err(err) => {
                    error!("Could not set {key}: {err}");
                    Reply::Failed(err.to_string())
                }
            },
            Command::Quit => {
                info!("Quitting");
                self.quit = true;
                Reply::Done
            }
        }
    }

    fn set(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let mut builder = match &self.config {
            Some(current) => ConfigBuilder::load(current.path())?,
            None => ConfigBuilder::new()?,
        };
        builder.set(key, value)?;
        self.configure(builder)
    }

    pub fn finalize(&mut self) {
        self.plugin_manager.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::{Hit, Item},
        plugins::{Plugin, PluginContext, PluginError},
    };
    use std::{cell::RefCell, rc::Rc};

    /// Records the trigger it was configured with.
    struct Recorder {
        trigger: Rc<RefCell<String>>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn search(&mut self, ctx: &mut PluginContext<'_>) {
            ctx.add(Item {
                id: ctx.query.into(),
                text: self.trigger.borrow().clone(),
                subtext: String::new(),
                actions: Vec::new(),
            });
        }

        fn activate(&mut self, item: &str, _action: &str) -> Result<(), PluginError> {
            Err(PluginError::UnknownItem(item.into()))
        }

        fn configure(&mut self, mut builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError> {
            builder.group("recorder", |group| {
                *self.trigger.borrow_mut() = group.get_or_create("trigger", "r ".to_string())?;
                Ok(())
            })?;
            Ok(builder)
        }
    }

    fn app_in(dir: &tempfile::TempDir) -> (App, Rc<RefCell<String>>) {
        let trigger = Rc::new(RefCell::new(String::new()));
        let manager = PluginManager::with_plugins(vec![Box::new(Recorder {
            trigger: Rc::clone(&trigger),
        })]);
        let mut app = App::with_plugin_manager(manager);
        app.configure(ConfigBuilder::load(dir.path().join("config.toml")).unwrap())
            .unwrap();
        (app, trigger)
    }

    #[test]
    fn set_writes_the_file_and_reconfigures() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, trigger) = app_in(&dir);
        assert_eq!(*trigger.borrow(), "r ");

        let reply = app.handle(Command::Set {
            key: "recorder.trigger".into(),
            value: ConfigValue::String("rec ".into()),
        });
        assert_eq!(reply, Reply::Done);
        assert_eq!(*trigger.borrow(), "rec ");

        let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
        assert!(written.contains("rec "));
    }

    #[test]
    fn broken_file_keeps_previous_config() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, trigger) = app_in(&dir);
        std::fs::write(dir.path().join("config.toml"), "recorder = [").unwrap();

        assert!(matches!(app.reload_config(), Err(ConfigError::Parse(_))));
        assert_eq!(*trigger.borrow(), "r ");
    }

    #[test]
    fn commands_produce_replies() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(&dir);

        let reply = app.handle(Command::Query { query: "q".into() });
        assert!(matches!(
            reply,
            Reply::Hits(hits) if hits == vec![Hit {
                plugin: "recorder".into(),
                item: Item {
                    id: "q".into(),
                    text: "r ".into(),
                    subtext: String::new(),
                    actions: Vec::new(),
                },
            }]
        ));

        let reply = app.handle(Command::Activate {
            plugin: "recorder".into(),
            item: "x".into(),
            action: "run".into(),
        });
        assert_eq!(reply, Reply::Failed("unknown item x".into()));

        assert!(!app.should_quit());
        assert_eq!(app.handle(Command::Quit), Reply::Done);
        assert!(app.should_quit());
    }
}
