//! exec: Emit a raw contract call.

use async_trait::async_trait;
use serde_json::json;

use crisp_types::{Action, Value};

use crate::modules::{ArgSpec, ArgType, Command, CommandArgs, CommandSchema, ExecContext, OptSpec};

/// Exec command: `exec <target> "transfer(address,uint256)" ...args`.
pub struct Exec;

/// Number of top-level parameters in a `name(type,...)` signature.
fn signature_arity(signature: &str) -> anyhow::Result<usize> {
    let (name, rest) = signature
        .split_once('(')
        .ok_or_else(|| anyhow::anyhow!("invalid signature '{}': expected name(types)", signature))?;
    let params = rest
        .strip_suffix(')')
        .filter(|_| !name.is_empty())
        .ok_or_else(|| anyhow::anyhow!("invalid signature '{}': expected name(types)", signature))?;
    if params.trim().is_empty() {
        return Ok(0);
    }

    let mut depth = 0i32;
    let mut count = 1;
    for c in params.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => count += 1,
            _ => {}
        }
        if depth < 0 {
            anyhow::bail!("invalid signature '{}': unbalanced parentheses", signature);
        }
    }
    if depth != 0 {
        anyhow::bail!("invalid signature '{}': unbalanced parentheses", signature);
    }
    Ok(count)
}

#[async_trait]
impl Command for Exec {
    fn name(&self) -> &str {
        "exec"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("exec", "Call a contract function")
            .arg(ArgSpec::required("target", ArgType::Address))
            .arg(ArgSpec::required("signature", ArgType::String))
            .arg(ArgSpec::rest("args", ArgType::Any))
            .opt(OptSpec::new("value", ArgType::Number, "Native value sent with the call"))
            .opt(OptSpec::new("from", ArgType::Address, "Account the call is sent from"))
    }

    async fn run(
        &self,
        args: CommandArgs,
        _ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let target = args.address(0)?;
        let signature = args.string(1)?;
        let params = args.values_from(2);

        let expected = signature_arity(signature)?;
        if expected != params.len() {
            anyhow::bail!(
                "{} takes {} parameter(s), got {}",
                signature,
                expected,
                params.len()
            );
        }

        let value = args
            .opt("value")
            .and_then(Value::as_number)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "0".to_string());
        let from = args.opt("from").map(Value::to_json);

        Ok(vec![Action::new(
            "call",
            json!({
                "to": target,
                "signature": signature,
                "args": params.iter().map(Value::to_json).collect::<Vec<_>>(),
                "value": value,
                "from": from,
            }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pause()", 0)]
    #[case("transfer(address,uint256)", 2)]
    #[case("submit((address,uint256)[],bytes)", 2)]
    fn counts_top_level_params(#[case] signature: &str, #[case] expected: usize) {
        assert_eq!(signature_arity(signature).unwrap(), expected);
    }

    #[rstest]
    #[case("transfer")]
    #[case("(address)")]
    #[case("f((address)")]
    fn rejects_malformed_signatures(#[case] signature: &str) {
        assert!(signature_arity(signature).is_err());
    }
}
