//! Credential persistence in a small INI file.
//!
//! Layout:
//!
//! ```text
//! [acesso]
//! usuario = alice
//! senha = secret1
//!
//! [url]
//! url = http://10.0.10.27/
//! ```
//!
//! Saving merges into whatever is already on disk. Loading never fails loudly:
//! a missing, unreadable or malformed file is reported as "no credentials".
//!
//! Files that are not UTF-8 (older installs wrote the locale code page) are
//! read byte-per-char as Latin-1 and written back the same way, so bytes
//! outside the keys we touch survive a save unchanged.

use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::CREDENTIALS_FILE_NAME;
use crate::ini::IniDocument;
use crate::models::Credentials;

const ACCESS_SECTION: &str = "acesso";
const ACCESS_SECTION_ALIAS: &str = "access";
const USERNAME_KEY: &str = "usuario";
const PASSWORD_KEY: &str = "senha";
const URL_SECTION: &str = "url";
const URL_KEY: &str = "url";

/// Reads and writes the kiosk's credentials file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in the same directory as the running executable.
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let dir = exe
            .parent()
            .context("Executable path has no parent directory")?;
        Ok(Self::new(dir.join(CREDENTIALS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved credentials, or `None` when either login field is missing.
    pub fn load(&self) -> Option<Credentials> {
        let doc = self.read_logged()?;

        let username = access_value(&doc, USERNAME_KEY).unwrap_or_default();
        let password = access_value(&doc, PASSWORD_KEY).unwrap_or_default();
        let url = doc.get(URL_SECTION, URL_KEY).unwrap_or_default();

        let credentials = Credentials::new(username, password, url);
        if !credentials.is_complete() {
            tracing::debug!("Credentials file {} has no complete login", self.path.display());
            return None;
        }
        Some(credentials)
    }

    /// Saved start-up URL, independent of whether a login is stored.
    pub fn load_url(&self) -> Option<String> {
        let doc = self.read_logged()?;
        doc.get(URL_SECTION, URL_KEY)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    /// Merge `credentials` into the file. Failures are logged and reported as `false`.
    pub fn save(&self, credentials: &Credentials) -> bool {
        match self.write(credentials) {
            Ok(()) => {
                tracing::info!("Credentials saved to {}", self.path.display());
                true
            }
            Err(e) => {
                tracing::error!("Failed to save credentials: {:#}", e);
                false
            }
        }
    }

    fn write(&self, credentials: &Credentials) -> Result<()> {
        for value in [&credentials.username, &credentials.password, &credentials.url] {
            if value.contains(['\n', '\r']) {
                bail!("Credential values cannot span multiple lines");
            }
        }

        let (mut doc, encoding) = self
            .read()
            .context("Refusing to overwrite a credentials file that cannot be read")?
            .unwrap_or_default();

        let access = if doc.has_section(ACCESS_SECTION) || !doc.has_section(ACCESS_SECTION_ALIAS) {
            ACCESS_SECTION
        } else {
            ACCESS_SECTION_ALIAS
        };
        doc.set(access, USERNAME_KEY, &credentials.username);
        doc.set(access, PASSWORD_KEY, &credentials.password);
        doc.set(URL_SECTION, URL_KEY, &credentials.url);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, encoding.encode(&doc.to_string()))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// `Ok(None)` when the file does not exist.
    fn read(&self) -> Result<Option<(IniDocument, FileEncoding)>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let (text, encoding) = FileEncoding::decode(bytes);
                if encoding == FileEncoding::Latin1 {
                    tracing::debug!("{} is not UTF-8, reading as Latin-1", self.path.display());
                }
                Ok(Some((IniDocument::parse(&text), encoding)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        }
    }

    fn read_logged(&self) -> Option<IniDocument> {
        match self.read() {
            Ok(Some((doc, _))) => Some(doc),
            Ok(None) => {
                tracing::info!("Credentials file not found: {}", self.path.display());
                None
            }
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        }
    }
}

/// On-disk text encoding of the credentials file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FileEncoding {
    #[default]
    Utf8,
    /// One byte per char; round-trips any byte sequence.
    Latin1,
}

impl FileEncoding {
    fn decode(bytes: Vec<u8>) -> (String, Self) {
        match String::from_utf8(bytes) {
            Ok(text) => (text, FileEncoding::Utf8),
            Err(e) => {
                let text = e.into_bytes().into_iter().map(char::from).collect();
                (text, FileEncoding::Latin1)
            }
        }
    }

    fn encode(self, text: &str) -> Vec<u8> {
        match self {
            FileEncoding::Utf8 => text.as_bytes().to_vec(),
            FileEncoding::Latin1 => match text
                .chars()
                .map(|c| u8::try_from(c).ok())
                .collect::<Option<Vec<u8>>>()
            {
                Some(bytes) => bytes,
                None => {
                    tracing::warn!("New values do not fit Latin-1, rewriting file as UTF-8");
                    text.as_bytes().to_vec()
                }
            },
        }
    }
}

fn access_value<'a>(doc: &'a IniDocument, key: &str) -> Option<&'a str> {
    doc.get(ACCESS_SECTION, key)
        .or_else(|| doc.get(ACCESS_SECTION_ALIAS, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join(CREDENTIALS_FILE_NAME))
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(), None);
        assert_eq!(store.load_url(), None);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let creds = Credentials::new("alice", "p@ss=word; #1", "http://10.0.10.27/");

        assert!(store.save(&creds));
        assert_eq!(store.load(), Some(creds));
        assert_eq!(store.load_url().as_deref(), Some("http://10.0.10.27/"));
    }

    #[test]
    fn test_load_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            "[acesso]\nusuario=alice\nsenha=secret1\n\n[url]\nurl=http://host/login\n",
        )
        .unwrap();

        assert_eq!(
            store.load(),
            Some(Credentials::new("alice", "secret1", "http://host/login"))
        );
    }

    #[test]
    fn test_load_accepts_english_section_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "[access]\nusuario=bob\nsenha=pw\n").unwrap();

        assert_eq!(store.load(), Some(Credentials::new("bob", "pw", "")));
    }

    #[test]
    fn test_incomplete_login_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "[acesso]\nusuario=alice\nsenha=\n[url]\nurl=http://x/\n")
            .unwrap();

        assert_eq!(store.load(), None);
        assert_eq!(store.load_url().as_deref(), Some("http://x/"));
    }

    #[test]
    fn test_malformed_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), [0xff, 0xfe, 0x00, b'[', b'\n']).unwrap();

        assert_eq!(store.load(), None);
        assert_eq!(store.load_url(), None);
    }

    #[test]
    fn test_code_page_file_is_read_and_merged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            b"[display]\nzoom = 125\nlabel = S\xe3o Paulo\n\n[acesso]\nusuario = alice\nsenha = ma\xe7\xe3\n",
        )
        .unwrap();

        assert_eq!(
            store.load(),
            Some(Credentials::new("alice", "ma\u{e7}\u{e3}", ""))
        );

        assert!(store.save(&Credentials::new("alice", "x", "http://u/")));

        let bytes = std::fs::read(store.path()).unwrap();
        assert!(bytes.starts_with(b"[display]\nzoom = 125\nlabel = S\xe3o Paulo\n"));
        assert_eq!(
            store.load(),
            Some(Credentials::new("alice", "x", "http://u/"))
        );
    }

    #[test]
    fn test_code_page_file_with_wide_value_becomes_utf8() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"[display]\nlabel = S\xe3o\n").unwrap();

        assert!(store.save(&Credentials::new("\u{4e2d}", "pw", "")));

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[display]\nlabel = S\u{e3}o\n"));
        assert_eq!(store.load(), Some(Credentials::new("\u{4e2d}", "pw", "")));
    }

    #[test]
    fn test_encoding_round_trips_every_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        let (text, encoding) = FileEncoding::decode(bytes.clone());
        assert_eq!(encoding, FileEncoding::Latin1);
        assert_eq!(encoding.encode(&text), bytes);
    }

    #[test]
    fn test_second_save_updates_url_and_keeps_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "[display]\nzoom = 125\n").unwrap();

        assert!(store.save(&Credentials::new("alice", "secret1", "http://first/")));
        assert!(store.save(&Credentials::new("alice", "secret1", "http://second/")));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.url, "http://second/");
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.password, "secret1");

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[display]\nzoom = 125\n"));
        assert_eq!(text.matches("[url]").count(), 1);
    }

    #[test]
    fn test_save_rejects_multiline_values() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.save(&Credentials::new("alice", "line1\nline2", "")));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("creds.ini"));

        assert!(store.save(&Credentials::new("a", "b", "")));
        assert_eq!(store.load(), Some(Credentials::new("a", "b", "")));
    }

    #[test]
    fn test_save_fails_when_path_is_a_directory() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());

        assert!(!store.save(&Credentials::new("a", "b", "")));
    }
}
