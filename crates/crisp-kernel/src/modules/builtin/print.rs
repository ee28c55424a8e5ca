//! print: Write values to the host log.

use async_trait::async_trait;

use crisp_types::Action;

use crate::modules::{ArgSpec, ArgType, Command, CommandArgs, CommandSchema, ExecContext};

pub struct Print;

#[async_trait]
impl Command for Print {
    fn name(&self) -> &str {
        "print"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("print", "Write values to the log")
            .arg(ArgSpec::rest("values", ArgType::Any))
    }

    async fn run(
        &self,
        args: CommandArgs,
        ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let line = args
            .values_from(0)
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        ctx.log(&line);
        Ok(Vec::new())
    }
}
