use crate::StepArgs;
use colored::Colorize;
use stackstep_cloud::description::{
    PROP_ENDPOINT, PROP_FLAVOR, PROP_GROUP_NAME, PROP_IDENTITY, PROP_IMAGE_NAME,
    PROP_INSTANCE_NAME, PROP_OS_64BIT, PROP_OS_FAMILY, PROP_PASSWORD, PROP_PROVIDER,
};
use stackstep_cloud::{CreateInstanceStep, ProviderRegistry, StepError};
use stackstep_cloud_openstack::OpenStackNovaProvider;
use stackstep_config::{ConfigError, StepProperties};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// 重ね合わせたステップ設定と、読み込んだ設定ファイル
pub struct CollectedProperties {
    pub properties: HashMap<String, String>,
    pub source: Option<PathBuf>,
}

/// ファイル < 環境変数 < フラグ の順に設定を重ねる
pub fn collect_properties(args: &StepArgs) -> anyhow::Result<CollectedProperties> {
    let (file, source) = load_file_layer(args)?;
    let env = stackstep_config::from_env();
    let flags = flag_layer(args);

    Ok(CollectedProperties {
        properties: file.merge(env).merge(flags).into_map(),
        source,
    })
}

fn load_file_layer(args: &StepArgs) -> anyhow::Result<(StepProperties, Option<PathBuf>)> {
    if args.no_config {
        return Ok((StepProperties::new(), None));
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => match stackstep_config::find_step_file() {
            Ok(path) => path,
            // 設定ファイルは任意
            Err(ConfigError::StepFileNotFound) => return Ok((StepProperties::new(), None)),
            Err(e) => return Err(e.into()),
        },
    };

    let properties = stackstep_config::load_step_file(&path).map_err(|e| {
        anyhow::anyhow!("設定ファイル {} を読み込めません: {}", path.display(), e)
    })?;
    Ok((properties, Some(path)))
}

fn flag_layer(args: &StepArgs) -> StepProperties {
    let mut flags = StepProperties::new();
    flags.set_opt(PROP_PROVIDER, args.provider.clone());
    flags.set_opt(PROP_ENDPOINT, args.endpoint.clone());
    flags.set_opt(PROP_IDENTITY, args.identity.clone());
    flags.set_opt(PROP_PASSWORD, args.password.clone());
    flags.set_opt(PROP_FLAVOR, args.flavor.clone());
    flags.set_opt(PROP_OS_FAMILY, args.os_family.clone());
    flags.set_opt(PROP_OS_64BIT, args.os_64bit.map(|b| b.to_string()));
    flags.set_opt(PROP_IMAGE_NAME, args.image_name.clone());
    flags.set_opt(PROP_INSTANCE_NAME, args.instance_name.clone());
    flags.set_opt(PROP_GROUP_NAME, args.group_name.clone());
    flags
}

/// 登録済みプロバイダーでステップを組み立てる
pub fn build_step(args: &StepArgs) -> anyhow::Result<CreateInstanceStep> {
    let mut client = reqwest::Client::builder();
    if let Some(secs) = args.timeout {
        client = client.timeout(Duration::from_secs(secs));
    }

    let mut provider = OpenStackNovaProvider::new().with_client(client.build()?);
    if let Some(region) = &args.region {
        provider = provider.with_region(region.clone());
    }

    let registry = ProviderRegistry::new().with_provider(Arc::new(provider));
    Ok(CreateInstanceStep::new(registry))
}

/// 読み込んだ設定ファイルを表示
pub fn print_source(source: &Option<PathBuf>) {
    if let Some(path) = source {
        println!("📄 設定ファイル: {}", path.display().to_string().cyan());
    }
}

/// ステップの失敗を表示して終了コード1で終了
pub fn exit_with_step_error(err: &StepError) -> ! {
    eprintln!();
    eprintln!(
        "{}",
        format!("✗ ステップが失敗しました [{}]", err.reason())
            .red()
            .bold()
    );
    eprintln!("  {}", err.message());
    std::process::exit(1);
}
