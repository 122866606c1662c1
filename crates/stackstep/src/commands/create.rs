use crate::StepArgs;
use crate::utils;
use colored::Colorize;

pub async fn handle(args: &StepArgs) -> anyhow::Result<()> {
    let collected = utils::collect_properties(args)?;
    utils::print_source(&collected.source);

    let step = utils::build_step(args)?;
    println!("{}", "インスタンスを作成中...".blue());

    match step.execute(&collected.properties).await {
        Ok(created) => {
            println!();
            println!(
                "{}",
                format!("✓ インスタンス '{}' を作成しました", created.name)
                    .green()
                    .bold()
            );
            println!("  ID: {}", created.node_id.cyan());
            println!("  グループ: {}", created.group.cyan());
            Ok(())
        }
        Err(e) => utils::exit_with_step_error(&e),
    }
}
