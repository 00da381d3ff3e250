// Session data access backed by an on-disk JSON-lines cache

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::InsightsError;

use super::{EventInfo, Lap, SessionKey, SessionRecord, Session};

/// Source of session telemetry.
pub trait TelemetryProvider {
    /// Load every lap and sample recorded for the given session.
    fn load(&self, key: &SessionKey) -> Result<Session, InsightsError>;
}

/// Reads sessions from `<cache_dir>/<season>/<venue>/<session>.jsonl`.
///
/// When an upstream URL is configured, a cache miss downloads the same
/// relative path from the upstream mirror into the cache before loading it.
pub struct CachedSessionProvider {
    cache_dir: PathBuf,
    upstream_url: Option<String>,
}

impl CachedSessionProvider {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            upstream_url: None,
        }
    }

    pub fn with_upstream(mut self, upstream_url: Option<String>) -> Self {
        self.upstream_url = upstream_url;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cached file for a session, relative to the cache root.
    pub fn relative_path(key: &SessionKey) -> PathBuf {
        PathBuf::from(key.season.to_string())
            .join(normalize_name(&key.venue))
            .join(format!("{}.jsonl", normalize_name(key.session_type.label())))
    }

    pub fn file_path(&self, key: &SessionKey) -> PathBuf {
        self.cache_dir.join(Self::relative_path(key))
    }

    fn fetch_upstream(&self, base_url: &str, key: &SessionKey) -> Result<(), InsightsError> {
        let relative = Self::relative_path(key);
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            relative.to_string_lossy().replace('\\', "/")
        );
        info!("Session {:?} not cached, fetching {}", key, url);

        let response = match ureq::get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Err(session_not_found(key)),
            Err(e) => {
                return Err(InsightsError::UpstreamFetchError {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        let target = self.file_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| InsightsError::CacheWriteError { source: e })?;
        }
        // write under a temporary name so an interrupted download never looks like a cached session
        let partial = target.with_extension("jsonl.part");
        let mut file =
            File::create(&partial).map_err(|e| InsightsError::CacheWriteError { source: e })?;
        let copied = io::copy(&mut response.into_reader(), &mut file);
        drop(file);
        if let Err(e) = copied {
            if let Err(remove_error) = fs::remove_file(&partial) {
                warn!("Could not remove partial download {:?}: {}", partial, remove_error);
            }
            return Err(InsightsError::UpstreamFetchError {
                url,
                reason: e.to_string(),
            });
        }
        fs::rename(&partial, &target).map_err(|e| InsightsError::CacheWriteError { source: e })?;
        debug!("Stored upstream session in {:?}", target);
        Ok(())
    }
}

impl TelemetryProvider for CachedSessionProvider {
    fn load(&self, key: &SessionKey) -> Result<Session, InsightsError> {
        let path = self.file_path(key);
        if !path.exists() {
            match &self.upstream_url {
                Some(base_url) => self.fetch_upstream(base_url, key)?,
                None => return Err(session_not_found(key)),
            }
        }

        let session = load_session_jsonl(&path, key)?;
        if session.laps.is_empty() {
            return Err(session_not_found(key));
        }
        Ok(session)
    }
}

fn session_not_found(key: &SessionKey) -> InsightsError {
    InsightsError::SessionNotFound {
        season: key.season,
        venue: key.venue.clone(),
        session: key.session_type.to_string(),
    }
}

/// Normalize a venue or session name for consistent file naming
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Parse a cached session file into laps grouped per driver.
pub fn load_session_jsonl(source_file: &Path, key: &SessionKey) -> Result<Session, InsightsError> {
    let records = serde_jsonlines::json_lines(source_file)
        .map_err(|e| InsightsError::SessionLoaderError { source: e })?
        .collect::<Result<Vec<SessionRecord>, io::Error>>()
        .map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => InsightsError::InvalidSessionFile {
                path: format!("{:?}", source_file),
                reason: e.to_string(),
            },
            _ => InsightsError::SessionLoaderError { source: e },
        })?;

    let mut info: Option<EventInfo> = None;
    let mut laps: Vec<Lap> = Vec::new();
    let mut lap_index: HashMap<(String, u32), usize> = HashMap::new();
    let mut samples = Vec::new();

    for record in records {
        match record {
            SessionRecord::Event(event) => {
                if info.is_none() {
                    info = Some(event);
                }
            }
            SessionRecord::Lap(lap) => {
                let lap_key = (lap.driver_id.clone(), lap.lap_number);
                if lap_index.contains_key(&lap_key) {
                    warn!(
                        "Duplicate lap {} for driver {} in {:?}, keeping the first",
                        lap.lap_number, lap.driver_id, source_file
                    );
                    continue;
                }
                lap_index.insert(lap_key, laps.len());
                laps.push(Lap::new(lap));
            }
            SessionRecord::Sample(sample) => samples.push(sample),
        }
    }

    // samples may precede their lap record in the file
    let mut orphaned = 0usize;
    for sample in samples {
        match lap_index.get(&(sample.driver_id.clone(), sample.lap_number)) {
            Some(&idx) => laps[idx].telemetry.push(sample),
            None => orphaned += 1,
        }
    }
    if orphaned > 0 {
        warn!(
            "Ignored {} telemetry samples without a recorded lap in {:?}",
            orphaned, source_file
        );
    }

    for lap in laps.iter_mut() {
        lap.telemetry
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    let info = info.unwrap_or_else(|| EventInfo {
        season: key.season,
        venue: key.venue.clone(),
        session_type: key.session_type,
        event_name: key.venue.clone(),
    });
    info!(
        "Loaded {:?}, found {} laps for {} {}",
        source_file,
        laps.len(),
        info.event_name,
        info.session_type
    );
    Ok(Session { info, laps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{LapRecord, SessionType, TelemetrySample};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Answers one connection per canned response and returns the requested paths.
    fn serve(responses: Vec<String>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/mirror", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut paths = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or_default();
                paths.push(path.to_string());
                stream.write_all(response.as_bytes()).unwrap();
            }
            paths
        });
        (url, handle)
    }

    fn http_response(status: &str, content_length: usize, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status, content_length, body
        )
    }

    fn jsonl(records: &[SessionRecord]) -> String {
        records
            .iter()
            .map(|record| serde_json::to_string(record).unwrap() + "\n")
            .collect()
    }

    fn write_session(dir: &Path, key: &SessionKey, records: &[SessionRecord]) {
        let path = dir.join(CachedSessionProvider::relative_path(key));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        for record in records {
            writeln!(file, "{}", serde_json::to_string(record).unwrap()).unwrap();
        }
    }

    fn sample(driver: &str, lap_number: u32, distance: f64) -> SessionRecord {
        SessionRecord::Sample(TelemetrySample {
            distance,
            speed: 250.,
            lap_number,
            driver_id: driver.to_string(),
            ..Default::default()
        })
    }

    fn lap(driver: &str, lap_number: u32) -> SessionRecord {
        SessionRecord::Lap(LapRecord {
            driver_id: driver.to_string(),
            lap_number,
            lap_time_s: Some(81.5),
        })
    }

    #[test]
    fn test_relative_path_is_normalized() {
        let key = SessionKey::new(2023, "Emilia Romagna", SessionType::FP1);
        assert_eq!(
            CachedSessionProvider::relative_path(&key),
            PathBuf::from("2023").join("emilia_romagna").join("fp1.jsonl")
        );
    }

    #[test]
    fn test_load_groups_samples_into_sorted_laps() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2023, "Monza", SessionType::Race);
        write_session(
            temp_dir.path(),
            &key,
            &[
                SessionRecord::Event(EventInfo {
                    season: 2023,
                    venue: "Monza".to_string(),
                    session_type: SessionType::Race,
                    event_name: "Italian Grand Prix".to_string(),
                }),
                sample("VER", 1, 20.),
                lap("VER", 1),
                sample("VER", 1, 10.),
                sample("LEC", 1, 10.),
            ],
        );

        let provider = CachedSessionProvider::new(temp_dir.path().to_path_buf());
        let session = provider.load(&key).unwrap();
        assert_eq!(session.info.event_name, "Italian Grand Prix");
        assert_eq!(session.laps.len(), 1);
        let distances = session.laps[0]
            .telemetry
            .iter()
            .map(|s| s.distance)
            .collect::<Vec<_>>();
        assert_eq!(distances, vec![10., 20.]);
    }

    #[test]
    fn test_missing_session_without_upstream_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let provider = CachedSessionProvider::new(temp_dir.path().to_path_buf());
        let result = provider.load(&SessionKey::new(2021, "Imola", SessionType::Qualifying));
        assert!(matches!(result, Err(InsightsError::SessionNotFound { .. })));
    }

    #[test]
    fn test_session_without_laps_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2022, "Monaco", SessionType::FP2);
        write_session(temp_dir.path(), &key, &[sample("VER", 1, 10.)]);
        let provider = CachedSessionProvider::new(temp_dir.path().to_path_buf());
        assert!(matches!(
            provider.load(&key),
            Err(InsightsError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_line_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2022, "Monaco", SessionType::Race);
        let path = temp_dir.path().join(CachedSessionProvider::relative_path(&key));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"Lap\": {\"driver_id\": 44}}\n").unwrap();

        let provider = CachedSessionProvider::new(temp_dir.path().to_path_buf());
        assert!(matches!(
            provider.load(&key),
            Err(InsightsError::InvalidSessionFile { .. })
        ));
    }

    #[test]
    fn test_event_info_falls_back_to_key() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2023, "Spa", SessionType::Qualifying);
        write_session(temp_dir.path(), &key, &[lap("HAM", 3)]);
        let provider = CachedSessionProvider::new(temp_dir.path().to_path_buf());
        let session = provider.load(&key).unwrap();
        assert_eq!(session.info.event_name, "Spa");
        assert_eq!(session.info.session_type, SessionType::Qualifying);
    }

    #[test]
    fn test_cache_miss_is_fetched_from_upstream() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2023, "Monza", SessionType::Race);
        let body = jsonl(&[lap("VER", 1), sample("VER", 1, 10.), sample("VER", 1, 5.)]);
        let (url, server) = serve(vec![http_response("200 OK", body.len(), &body)]);

        let provider =
            CachedSessionProvider::new(temp_dir.path().to_path_buf()).with_upstream(Some(url));
        let session = provider.load(&key).unwrap();
        assert_eq!(session.laps[0].telemetry.len(), 2);
        assert_eq!(server.join().unwrap(), vec!["/mirror/2023/monza/race.jsonl"]);

        let cached = provider.file_path(&key);
        assert_eq!(fs::read_to_string(&cached).unwrap(), body);
        assert!(!cached.with_extension("jsonl.part").exists());
        // the server is gone, so this load is served from the cache
        assert_eq!(provider.load(&key).unwrap().laps.len(), 1);
    }

    #[test]
    fn test_upstream_404_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2023, "Monza", SessionType::Qualifying);
        let (url, server) = serve(vec![http_response("404 Not Found", 0, "")]);

        let provider =
            CachedSessionProvider::new(temp_dir.path().to_path_buf()).with_upstream(Some(url));
        assert!(matches!(
            provider.load(&key),
            Err(InsightsError::SessionNotFound { .. })
        ));
        server.join().unwrap();
        assert!(!provider.file_path(&key).exists());
    }

    #[test]
    fn test_interrupted_download_leaves_no_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let key = SessionKey::new(2023, "Monza", SessionType::Race);
        let body = jsonl(&[lap("VER", 1)]);
        // the announced length is never delivered
        let (url, server) = serve(vec![http_response("200 OK", body.len() + 512, &body)]);

        let provider =
            CachedSessionProvider::new(temp_dir.path().to_path_buf()).with_upstream(Some(url));
        assert!(matches!(
            provider.load(&key),
            Err(InsightsError::UpstreamFetchError { .. })
        ));
        server.join().unwrap();
        let target = provider.file_path(&key);
        assert!(!target.exists());
        assert!(!target.with_extension("jsonl.part").exists());
    }
}
