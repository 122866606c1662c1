use crate::StepArgs;
use crate::utils;
use colored::Colorize;
use stackstep_cloud::{ProvisionRequest, StepError};

pub fn handle(args: &StepArgs) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let collected = utils::collect_properties(args)?;
    utils::print_source(&collected.source);

    match ProvisionRequest::from_properties(&collected.properties) {
        Ok(request) => {
            println!("{}", "✓ 設定は正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  プロバイダー: {}", request.provider.cyan());
            println!("  エンドポイント: {}", request.endpoint.as_str().cyan());
            println!("  アイデンティティ: {}", request.identity.cyan());
            println!("  フレーバー: {}", request.flavor.cyan());
            match &request.image_name {
                Some(image) => println!("  イメージ: {}", image.cyan()),
                None => println!(
                    "  OS: {} ({})",
                    request.os_family.to_string().cyan(),
                    if request.is_64bit { "64bit" } else { "32bit" }
                ),
            }
            println!(
                "  インスタンス: {} (グループ: {})",
                request.instance_name.cyan(),
                request.group_name.cyan()
            );
            Ok(())
        }
        Err(e) => utils::exit_with_step_error(&StepError::from(e)),
    }
}
