//! Account list files.
//!
//! Two formats are accepted: a YAML sequence (or a mapping with an `accounts`
//! key) and, for `.txt` files, one handle per line with `#` comments. A
//! dash list that YAML rejects (`- @sama`, since `@` is reserved) is read
//! line by line.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("failed to read account list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid account list {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccountsDoc {
    List(Vec<String>),
    Keyed { accounts: Vec<String> },
}

/// Read and normalise the handles listed in `path`.
pub fn load_accounts(path: &Path) -> Result<Vec<String>, AccountsError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| AccountsError::Io {
        path: display.clone(),
        source,
    })?;

    let is_text = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

    let handles = if is_text {
        raw.lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .map(str::to_string)
            .collect()
    } else if raw.trim().is_empty() {
        Vec::new()
    } else {
        match serde_yaml::from_str::<AccountsDoc>(&raw) {
            Ok(AccountsDoc::List(list)) | Ok(AccountsDoc::Keyed { accounts: list }) => list,
            Err(source) => match dash_list(&raw) {
                Some(list) => {
                    tracing::debug!(path = %path.display(), error = %source, "reading account list line by line");
                    list
                }
                None => {
                    return Err(AccountsError::Yaml {
                        path: display,
                        source,
                    })
                }
            },
        }
    };

    Ok(normalize_handles(handles))
}

/// Items of a plain `- handle` list, or `None` if any other line is present.
fn dash_list(raw: &str) -> Option<Vec<String>> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.strip_prefix('-')
                .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        })
        .collect()
}

/// Trim, drop leading `@`, skip blanks and keep the first occurrence of each handle.
pub fn normalize_handles<I, S>(handles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    handles
        .into_iter()
        .filter_map(|h| {
            let h = h.as_ref().trim().trim_start_matches('@').trim();
            (!h.is_empty()).then(|| h.to_string())
        })
        .filter(|h| seen.insert(h.to_ascii_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_yaml_sequence() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("accounts.yaml");
        fs::write(&p, "- karpathy\n- '@sama'\n- OpenAI\n").unwrap();
        assert_eq!(load_accounts(&p).unwrap(), vec!["karpathy", "sama", "OpenAI"]);
    }

    #[test]
    fn reads_keyed_yaml() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("accounts.yml");
        fs::write(&p, "accounts:\n  - AnthropicAI\n  - GoogleDeepMind\n").unwrap();
        assert_eq!(load_accounts(&p).unwrap(), vec!["AnthropicAI", "GoogleDeepMind"]);
    }

    #[test]
    fn reads_text_with_comments() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("accounts.txt");
        fs::write(&p, "# labs\nOpenAI\n\n@karpathy  # tutorials\nopenai\n").unwrap();
        assert_eq!(load_accounts(&p).unwrap(), vec!["OpenAI", "karpathy"]);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_accounts(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("accounts.yaml");
        fs::write(&p, "accounts: 42\n").unwrap();
        assert!(matches!(load_accounts(&p), Err(AccountsError::Yaml { .. })));
    }

    #[test]
    fn unquoted_at_handles_in_a_dash_list_still_load() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("accounts.yaml");
        fs::write(&p, "# tracked\n- OpenAI\n- @sama  # ceo\n- \"@karpathy\"\n").unwrap();
        assert_eq!(load_accounts(&p).unwrap(), vec!["OpenAI", "sama", "karpathy"]);
    }
}
