use crate::StepArgs;
use crate::utils;
use colored::Colorize;

pub async fn handle(args: &StepArgs) -> anyhow::Result<()> {
    let collected = utils::collect_properties(args)?;
    utils::print_source(&collected.source);

    let step = utils::build_step(args)?;
    println!("{}", "認証を確認中...".blue());

    match step.check_auth(&collected.properties).await {
        Ok(()) => {
            println!("{}", "✓ 認証に成功しました".green().bold());
            Ok(())
        }
        Err(e) => utils::exit_with_step_error(&e),
    }
}
