use serde::{Deserialize, Serialize};

pub const PLUGIN_NAME: &str = "kubo-ipfs";
pub const HOOK_BUILD: &str = "build";
pub const HOOK_SERVE: &str = "serve";

/// What the plugin registers with the host. Purely declarative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub commands: Vec<CommandSpec>,
    pub hooks: Vec<HookSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(rename = "use")]
    pub use_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_command_under: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn new(use_: impl Into<String>) -> Self {
        Self {
            use_: use_.into(),
            place_command_under: None,
            commands: Vec::new(),
        }
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.place_command_under = Some(parent.into());
        self
    }

    pub fn subcommand(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSpec {
    pub name: String,
    pub place_hook_on: String,
}

impl Manifest {
    /// `ignite ipfs {shutdown,restart}` plus the serve and build hooks.
    pub fn kubo() -> Self {
        Self {
            name: PLUGIN_NAME.to_string(),
            commands: vec![CommandSpec::new("ipfs")
                .under("ignite")
                .subcommand(CommandSpec::new(crate::router::COMMAND_SHUTDOWN))
                .subcommand(CommandSpec::new(crate::router::COMMAND_RESTART))],
            hooks: vec![
                HookSpec {
                    name: HOOK_SERVE.to_string(),
                    place_hook_on: "ignite chain serve".to_string(),
                },
                HookSpec {
                    name: HOOK_BUILD.to_string(),
                    place_hook_on: "ignite chain build".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_shape() {
        let manifest = Manifest::kubo();
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["name"], "kubo-ipfs");
        assert_eq!(json["commands"][0]["use"], "ipfs");
        assert_eq!(json["commands"][0]["place_command_under"], "ignite");
        let subs: Vec<&str> = manifest.commands[0]
            .commands
            .iter()
            .map(|c| c.use_.as_str())
            .collect();
        assert_eq!(subs, vec!["shutdown", "restart"]);
        assert!(json["commands"][0]["commands"][0].get("commands").is_none());

        let hooks: Vec<(&str, &str)> = manifest
            .hooks
            .iter()
            .map(|h| (h.name.as_str(), h.place_hook_on.as_str()))
            .collect();
        assert_eq!(
            hooks,
            vec![("serve", "ignite chain serve"), ("build", "ignite chain build")]
        );
    }
}
