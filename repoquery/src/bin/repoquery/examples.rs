use crate::commands::{entities, keywords, parse};

/// Titled set of invocations shown under a subcommand's `--help`.
#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

/// Examples attached to the subcommand called `name`.
#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        // method names against a root type, one tree per name
        CommandExample {
            name: "parse",
            groups: parse::EXAMPLES,
        },
        // registry contents built from the scanned structs
        CommandExample {
            name: "entities",
            groups: entities::EXAMPLES,
        },
        // vocabulary after configured aliases and custom keywords
        CommandExample {
            name: "keywords",
            groups: keywords::EXAMPLES,
        },
    ]
}
