pub mod error;

pub use error::*;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 4] = ["step.local.yaml", ".step.local.yaml", "step.yaml", ".step.yaml"];

/// ステップ設定ファイル (step.yaml) を探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 STACKSTEP_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: step.local.yaml, .step.local.yaml, step.yaml, .step.yaml
/// 3. ./.stackstep/ ディレクトリ内: 同様の順序
/// 4. ~/.config/stackstep/step.yaml (グローバル設定)
pub fn find_step_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("STACKSTEP_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    // 3. ./.stackstep/ ディレクトリで検索
    let step_dir = current_dir.join(".stackstep");
    if step_dir.is_dir() {
        if let Some(path) = first_existing(&step_dir) {
            return Ok(path);
        }
    }

    // 4. グローバル設定ファイル (~/.config/stackstep/step.yaml)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stackstep").join("step.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::StepFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}

/// ステップに渡すキーと値の集合
///
/// ファイル < 環境変数 < CLIフラグ の順に [`StepProperties::merge`] で重ねる。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProperties {
    values: BTreeMap<String, String>,
}

impl StepProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// 値がある場合だけ設定する
    pub fn set_opt(&mut self, key: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `overlay` の値で上書きした新しい集合を返す
    pub fn merge(mut self, overlay: StepProperties) -> Self {
        self.values.extend(overlay.values);
        self
    }

    /// ステップが受け取る形式に変換
    pub fn into_map(self) -> HashMap<String, String> {
        self.values.into_iter().collect()
    }
}

impl FromIterator<(String, String)> for StepProperties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// YAMLのステップ設定ファイルを読み込む
///
/// トップレベルはフラットなマッピング。スカラー値は文字列に変換し、
/// null は読み飛ばす。
pub fn load_step_file(path: &Path) -> Result<StepProperties> {
    let content = std::fs::read_to_string(path)?;
    tracing::debug!("Loading step configuration from {}", path.display());
    parse_step_yaml(&content)
}

pub fn parse_step_yaml(content: &str) -> Result<StepProperties> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;

    let mapping = match value {
        serde_yaml::Value::Mapping(mapping) => mapping,
        // 空ファイル
        serde_yaml::Value::Null => return Ok(StepProperties::new()),
        other => return Err(ConfigError::NotAMapping(format!("{:?}", other))),
    };

    let mut properties = StepProperties::new();
    for (key, value) in mapping {
        let key = scalar_to_string(&key)
            .ok_or_else(|| ConfigError::NotAMapping(format!("{:?}", key)))?;
        if value.is_null() {
            continue;
        }
        let value = scalar_to_string(&value)
            .ok_or_else(|| ConfigError::UnsupportedValue { key: key.clone() })?;
        properties.set(key, value);
    }

    Ok(properties)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// OpenStack標準の環境変数 (OS_*) から読み込む
pub fn from_env() -> StepProperties {
    from_env_with(|key| std::env::var(key).ok())
}

/// 任意の変数ソースから読み込む
///
/// - `OS_AUTH_URL` → `endpoint`
/// - `OS_PASSWORD` → `password`
/// - `OS_TENANT_NAME` (なければ `OS_PROJECT_NAME`) と `OS_USERNAME` → `identity` (`tenant:user`)
pub fn from_env_with<F>(lookup: F) -> StepProperties
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let mut properties = StepProperties::new();

    properties.set_opt("endpoint", get("OS_AUTH_URL"));
    properties.set_opt("password", get("OS_PASSWORD"));

    let tenant = get("OS_TENANT_NAME").or_else(|| get("OS_PROJECT_NAME"));
    let identity = match (tenant, get("OS_USERNAME")) {
        (Some(tenant), Some(user)) => Some(format!("{}:{}", tenant, user)),
        (None, Some(user)) => Some(user),
        (_, None) => None,
    };
    properties.set_opt("identity", identity);

    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_step_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("step.yaml"), "flavor: m1.small").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_step_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("step.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_step_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        // step.yaml と step.local.yaml の両方を作成
        fs::write(temp_dir.path().join("step.yaml"), "# shared").unwrap();
        fs::write(temp_dir.path().join("step.local.yaml"), "# local").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_step_file();
        std::env::set_current_dir(original_dir).unwrap();

        // step.local.yaml が優先される
        assert!(result.unwrap().ends_with("step.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_step_file_in_step_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let step_dir = temp_dir.path().join(".stackstep");
        fs::create_dir(&step_dir).unwrap();
        fs::write(step_dir.join("step.yaml"), "# in step dir").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_step_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".stackstep/step.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_step_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "# custom").unwrap();

        temp_env::with_var("STACKSTEP_CONFIG_PATH", Some(&config_path), || {
            assert_eq!(find_step_file().unwrap(), config_path);
        });
    }

    // dirs::config_dir が XDG_CONFIG_HOME を参照するのは Linux のみ
    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_find_step_file_not_found_leaves_home_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let work_dir = temp_dir.path().join("work");
        let xdg_dir = temp_dir.path().join("xdg");
        fs::create_dir(&work_dir).unwrap();
        fs::create_dir(&xdg_dir).unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&work_dir).unwrap();
        let result = temp_env::with_vars(
            [
                ("STACKSTEP_CONFIG_PATH", None),
                ("XDG_CONFIG_HOME", Some(xdg_dir.as_os_str())),
            ],
            find_step_file,
        );
        std::env::set_current_dir(original_dir).unwrap();

        assert!(matches!(result, Err(ConfigError::StepFileNotFound)));
        // 検索だけで設定ディレクトリを作らない
        assert!(!xdg_dir.join("stackstep").exists());
    }

    // dirs::config_dir が XDG_CONFIG_HOME を参照するのは Linux のみ
    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_find_step_file_global() {
        let temp_dir = tempfile::tempdir().unwrap();
        let work_dir = temp_dir.path().join("work");
        let global_dir = temp_dir.path().join("xdg").join("stackstep");
        fs::create_dir(&work_dir).unwrap();
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(global_dir.join("step.yaml"), "# global").unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&work_dir).unwrap();
        let result = temp_env::with_vars(
            [
                ("STACKSTEP_CONFIG_PATH", None),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().join("xdg").into_os_string())),
            ],
            find_step_file,
        );
        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(result.unwrap(), global_dir.join("step.yaml"));
    }

    #[test]
    fn test_parse_step_yaml_scalars() {
        let properties = parse_step_yaml(
            r#"
endpoint: http://10.0.0.1:5000/v2.0/
identity: "tenantA:user1"
os64Bit: true
flavor: m1.small
port: 8774
imageName: ~
"#,
        )
        .unwrap();

        assert_eq!(properties.get("endpoint"), Some("http://10.0.0.1:5000/v2.0/"));
        assert_eq!(properties.get("identity"), Some("tenantA:user1"));
        assert_eq!(properties.get("os64Bit"), Some("true"));
        assert_eq!(properties.get("port"), Some("8774"));
        assert_eq!(properties.get("imageName"), None);
        assert_eq!(properties.len(), 5);
    }

    #[test]
    fn test_parse_step_yaml_rejects_nested() {
        let err = parse_step_yaml("flavor:\n  name: m1.small\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedValue { key } if key == "flavor"));

        let err = parse_step_yaml("- a\n- b\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping(_)));

        assert!(parse_step_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_load_step_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("step.yaml");
        fs::write(&path, "groupName: web\ninstanceName: web-01\n").unwrap();

        let properties = load_step_file(&path).unwrap();
        assert_eq!(properties.get("groupName"), Some("web"));
        assert_eq!(properties.get("instanceName"), Some("web-01"));
    }

    #[test]
    fn test_from_env_with() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OS_AUTH_URL", "http://10.0.0.1:5000/v2.0/"),
            ("OS_USERNAME", "user1"),
            ("OS_PROJECT_NAME", "tenantA"),
            ("OS_PASSWORD", "secret"),
        ]);

        let properties = from_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(properties.get("endpoint"), Some("http://10.0.0.1:5000/v2.0/"));
        assert_eq!(properties.get("identity"), Some("tenantA:user1"));
        assert_eq!(properties.get("password"), Some("secret"));
    }

    #[test]
    fn test_from_env_user_only() {
        let properties = from_env_with(|k| (k == "OS_USERNAME").then(|| "admin".to_string()));
        assert_eq!(properties.get("identity"), Some("admin"));
        assert_eq!(properties.get("endpoint"), None);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_env() {
        temp_env::with_vars(
            [
                ("OS_AUTH_URL", Some("http://keystone:5000/v3")),
                ("OS_TENANT_NAME", Some("ops")),
                ("OS_PROJECT_NAME", None),
                ("OS_USERNAME", Some("deploy")),
                ("OS_PASSWORD", None),
            ],
            || {
                let properties = from_env();
                assert_eq!(properties.get("endpoint"), Some("http://keystone:5000/v3"));
                assert_eq!(properties.get("identity"), Some("ops:deploy"));
                assert_eq!(properties.get("password"), None);
            },
        );
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut file = StepProperties::new();
        file.set("flavor", "m1.tiny");
        file.set("groupName", "web");

        let mut flags = StepProperties::new();
        flags.set("flavor", "m1.small");

        let merged = file.merge(flags).into_map();
        assert_eq!(merged.get("flavor").map(String::as_str), Some("m1.small"));
        assert_eq!(merged.get("groupName").map(String::as_str), Some("web"));
    }
}
