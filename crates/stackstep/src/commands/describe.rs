use colored::Colorize;
use stackstep_cloud::{PropertyKind, describe};

pub fn handle(json: bool) -> anyhow::Result<()> {
    let description = describe();

    if json {
        println!("{}", serde_json::to_string_pretty(&description)?);
        return Ok(());
    }

    println!("{} ({})", description.title.bold(), description.name);
    println!("{}", description.description);
    println!();

    for property in &description.properties {
        let kind = match &property.kind {
            PropertyKind::String => "string".to_string(),
            PropertyKind::Boolean => "boolean".to_string(),
            PropertyKind::Select { values } => format!("select: {}", values.join(", ")),
            PropertyKind::FreeSelect { values } => format!("free-select: {}", values.join(", ")),
        };
        let required = if property.required {
            "必須".red().to_string()
        } else {
            "任意".dimmed().to_string()
        };

        print!("  {} [{}] {}", property.name.cyan(), kind, required);
        if let Some(default) = property.default_value {
            print!(" (デフォルト: {})", default);
        }
        println!();
        println!("      {}: {}", property.title, property.description);
    }

    Ok(())
}
