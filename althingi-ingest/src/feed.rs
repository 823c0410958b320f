//! Remote feed client
//!
//! Fetches named, parameterized XML documents from the Althingi feed with
//! bounded retries, optionally serving from (and populating) an on-disk
//! cache. Documents are indexed by logical name, not literal URL, so the
//! rest of the engine never sees a URL.

use althingi_common::config::Settings;
use althingi_common::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Extra attempts after the first failed fetch.
const RETRY_COUNT: u32 = 2;

/// Pause between attempts. The upstream sporadically serves an HTML error
/// page instead of XML; a short wait is usually enough for it to recover.
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Logical names for the feed's documents.
///
/// Templates take positional `%d` parameters, matching the upstream URL
/// scheme (parliament number, entity number, or both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUrl {
    CategoriesList,
    Document,
    Parliament,
    IssueList,
    Issue,
    IssueSummary,
    MinisterList,
    MinisterSeats,
    Parties,
    Person,
    PersonsMps,
    PersonsMinisters,
    PresidentList,
    Seats,
    CommitteeFullList,
    CommitteeList,
    CommitteeSeats,
    CommitteeAgendaList,
    CommitteeAgenda,
    Constituencies,
    SessionList,
    SessionAgenda,
    SessionNextAgenda,
    Speeches,
    VoteCasting,
    VoteCastings,
}

impl FeedUrl {
    /// Stable name used for cache filenames and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FeedUrl::CategoriesList => "CATEGORIES_LIST",
            FeedUrl::Document => "DOCUMENT",
            FeedUrl::Parliament => "PARLIAMENT",
            FeedUrl::IssueList => "ISSUE_LIST",
            FeedUrl::Issue => "ISSUE",
            FeedUrl::IssueSummary => "ISSUE_SUMMARY",
            FeedUrl::MinisterList => "MINISTER_LIST",
            FeedUrl::MinisterSeats => "MINISTER_SEATS",
            FeedUrl::Parties => "PARTIES",
            FeedUrl::Person => "PERSON",
            FeedUrl::PersonsMps => "PERSONS_MPS",
            FeedUrl::PersonsMinisters => "PERSONS_MINISTERS",
            FeedUrl::PresidentList => "PRESIDENT_LIST",
            FeedUrl::Seats => "SEATS",
            FeedUrl::CommitteeFullList => "COMMITTEE_FULL_LIST",
            FeedUrl::CommitteeList => "COMMITTEE_LIST",
            FeedUrl::CommitteeSeats => "COMMITTEE_SEATS",
            FeedUrl::CommitteeAgendaList => "COMMITTEE_AGENDA_LIST",
            FeedUrl::CommitteeAgenda => "COMMITTEE_AGENDA",
            FeedUrl::Constituencies => "CONSTITUENCIES",
            FeedUrl::SessionList => "SESSION_LIST",
            FeedUrl::SessionAgenda => "SESSION_AGENDA",
            FeedUrl::SessionNextAgenda => "SESSION_NEXT_AGENDA",
            FeedUrl::Speeches => "SPEECHES",
            FeedUrl::VoteCasting => "VOTE_CASTING",
            FeedUrl::VoteCastings => "VOTE_CASTINGS",
        }
    }

    fn template(self) -> &'static str {
        match self {
            FeedUrl::CategoriesList => "http://www.althingi.is/altext/xml/efnisflokkar/",
            FeedUrl::Document => {
                "http://www.althingi.is/altext/xml/thingskjol/thingskjal/?lthing=%d&skjalnr=%d"
            }
            FeedUrl::Parliament => "http://www.althingi.is/altext/xml/loggjafarthing/?lthing=%d",
            FeedUrl::IssueList => "http://www.althingi.is/altext/xml/thingmalalisti/?lthing=%d",
            FeedUrl::Issue => {
                "http://www.althingi.is/altext/xml/thingmalalisti/thingmal/?lthing=%d&malnr=%d"
            }
            FeedUrl::IssueSummary => {
                "http://www.althingi.is/altext/xml/samantektir/samantekt/?lthing=%d&malnr=%d"
            }
            FeedUrl::MinisterList => {
                "http://www.althingi.is/altext/xml/radherraembaetti/?lthing=%d"
            }
            FeedUrl::MinisterSeats => {
                "http://www.althingi.is/altext/xml/radherrar/radherraseta/?nr=%d"
            }
            FeedUrl::Parties => "http://www.althingi.is/altext/xml/thingflokkar/?lthing=%d",
            FeedUrl::Person => "http://www.althingi.is/altext/xml/thingmenn/thingmadur/?nr=%d",
            FeedUrl::PersonsMps => "http://www.althingi.is/altext/xml/thingmenn/?lthing=%d",
            FeedUrl::PersonsMinisters => "http://www.althingi.is/altext/xml/radherrar/?lthing=%d",
            FeedUrl::PresidentList => "http://www.althingi.is/altext/xml/forsetar/?lthing=%d",
            FeedUrl::Seats => {
                "http://www.althingi.is/altext/xml/thingmenn/thingmadur/thingseta/?nr=%d"
            }
            FeedUrl::CommitteeFullList => "http://www.althingi.is/altext/xml/nefndir/",
            FeedUrl::CommitteeList => "http://www.althingi.is/altext/xml/nefndir/?lthing=%d",
            FeedUrl::CommitteeSeats => {
                "http://www.althingi.is/altext/xml/thingmenn/thingmadur/nefndaseta/?nr=%d"
            }
            FeedUrl::CommitteeAgendaList => {
                "http://www.althingi.is/altext/xml/nefndarfundir/?lthing=%d"
            }
            FeedUrl::CommitteeAgenda => {
                "http://www.althingi.is/altext/xml/nefndarfundir/nefndarfundur/?dagskrarnumer=%d"
            }
            FeedUrl::Constituencies => "http://www.althingi.is/altext/xml/kjordaemi/?lthing=%d",
            FeedUrl::SessionList => "http://www.althingi.is/altext/xml/thingfundir/?lthing=%d",
            FeedUrl::SessionAgenda => {
                "http://www.althingi.is/altext/xml/dagskra/thingfundur/?lthing=%d&fundur=%d"
            }
            FeedUrl::SessionNextAgenda => "http://www.althingi.is/altext/xml/dagskra/thingfundur/",
            FeedUrl::Speeches => "http://www.althingi.is/altext/xml/raedulisti/?lthing=%d",
            FeedUrl::VoteCasting => {
                "http://www.althingi.is/altext/xml/atkvaedagreidslur/atkvaedagreidsla/?numer=%d"
            }
            FeedUrl::VoteCastings => {
                "http://www.althingi.is/altext/xml/atkvaedagreidslur/?lthing=%d"
            }
        }
    }

    /// Render the template with positional arguments, appending the optional
    /// `days` throttle parameter.
    fn render(self, args: &[i64], days: Option<i64>) -> Result<String> {
        let mut url = String::new();
        let mut remaining = self.template();
        let mut used = 0;

        while let Some(pos) = remaining.find("%d") {
            let arg = args.get(used).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Feed document {} takes more parameters than given",
                    self.name()
                ))
            })?;
            url.push_str(&remaining[..pos]);
            url.push_str(&arg.to_string());
            remaining = &remaining[pos + 2..];
            used += 1;
        }
        url.push_str(remaining);

        if used != args.len() {
            return Err(Error::InvalidInput(format!(
                "Feed document {} given {} parameters, takes {}",
                self.name(),
                args.len(),
                used
            )));
        }

        if let Some(days) = days {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&format!("dagar={}", days));
        }

        Ok(url)
    }
}

/// HTTP client for the feed, with retry and optional on-disk caching.
pub struct FeedClient {
    http: reqwest::Client,
    use_cache: bool,
    cache_dir: PathBuf,
}

impl FeedClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.remote_timeout_secs))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            use_cache: settings.xml_use_cache,
            cache_dir: settings.xml_cache_dir.clone(),
        })
    }

    /// Fetch a named feed document, returning its XML body.
    ///
    /// The body is parse-validated before being returned; an unparseable
    /// body counts as a failed attempt, since the upstream sporadically
    /// serves HTML error pages in place of XML.
    pub async fn fetch_xml(
        &self,
        url: FeedUrl,
        args: &[i64],
        days: Option<i64>,
    ) -> Result<String> {
        let cache_file = self.cache_filename(url, args, days);

        if self.use_cache && cache_file.is_file() {
            let content = std::fs::read_to_string(&cache_file)?;
            roxmltree::Document::parse(&content).map_err(|e| {
                Error::Xml(format!("cached {}: {}", cache_file.display(), e))
            })?;
            return Ok(content);
        }

        let rendered = url.render(args, days)?;
        let mut last_error = String::new();

        for attempt in 0..=RETRY_COUNT {
            if attempt > 0 {
                tracing::warn!(
                    url = %rendered,
                    attempt,
                    "Retrying feed fetch: {}",
                    last_error
                );
                tokio::time::sleep(RETRY_PAUSE).await;
            }

            let content = match self.get_text(&rendered).await {
                Ok(content) => content,
                Err(e) => {
                    last_error = e;
                    continue;
                }
            };

            if let Err(e) = roxmltree::Document::parse(&content) {
                last_error = format!("invalid XML: {}", e);
                continue;
            }

            if self.use_cache {
                std::fs::create_dir_all(&self.cache_dir)?;
                std::fs::write(&cache_file, &content)?;
            }

            return Ok(content);
        }

        Err(Error::Transport(format!(
            "Failed retrieving {}: {}",
            rendered, last_error
        )))
    }

    /// Fetch an arbitrary remote path (document/review bodies), with the
    /// same retry policy as XML fetches.
    pub async fn fetch_bytes(&self, raw_url: &str) -> Result<Vec<u8>> {
        let mut last_error = String::new();

        for attempt in 0..=RETRY_COUNT {
            if attempt > 0 {
                tokio::time::sleep(RETRY_PAUSE).await;
            }

            match self.get_bytes(raw_url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => last_error = e,
            }
        }

        Err(Error::Transport(format!(
            "Failed retrieving {}: {}",
            raw_url, last_error
        )))
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let response = response.error_for_status().map_err(|e| e.to_string())?;
        response.text().await.map_err(|e| e.to_string())
    }

    async fn get_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let response = response.error_for_status().map_err(|e| e.to_string())?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }

    /// Cache filename: `<NAME>[.<arg>...][.days_<n>].xml`
    fn cache_filename(&self, url: FeedUrl, args: &[i64], days: Option<i64>) -> PathBuf {
        let mut filename = url.name().to_string();
        for arg in args {
            filename.push_str(&format!(".{}", arg));
        }
        if let Some(days) = days {
            filename.push_str(&format!(".days_{}", days));
        }
        filename.push_str(".xml");
        self.cache_dir.join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client(cache_dir: &std::path::Path) -> FeedClient {
        let settings = Settings {
            xml_use_cache: true,
            xml_cache_dir: cache_dir.to_path_buf(),
            ..Settings::default()
        };
        FeedClient::new(&settings).unwrap()
    }

    #[test]
    fn test_render_positional_args() {
        let url = FeedUrl::Issue.render(&[148, 5], None).unwrap();
        assert_eq!(
            url,
            "http://www.althingi.is/altext/xml/thingmalalisti/thingmal/?lthing=148&malnr=5"
        );
    }

    #[test]
    fn test_render_days_parameter() {
        let url = FeedUrl::VoteCastings.render(&[148], Some(7)).unwrap();
        assert!(url.ends_with("?lthing=148&dagar=7"));

        let url = FeedUrl::SessionNextAgenda.render(&[], Some(7)).unwrap();
        assert!(url.ends_with("/?dagar=7"));
    }

    #[test]
    fn test_render_arity_mismatch() {
        assert!(FeedUrl::Issue.render(&[148], None).is_err());
        assert!(FeedUrl::CommitteeFullList.render(&[148], None).is_err());
    }

    #[tokio::test]
    async fn test_cache_hit_without_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("PARLIAMENT.148.xml"),
            "<löggjafarþing númer=\"148\"/>",
        )
        .unwrap();

        let client = offline_client(dir.path());
        let content = client.fetch_xml(FeedUrl::Parliament, &[148], None).await.unwrap();
        assert!(content.contains("148"));
    }

    #[tokio::test]
    async fn test_cached_garbage_is_xml_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PARLIAMENT.148.xml"), "<broken").unwrap();

        let client = offline_client(dir.path());
        match client.fetch_xml(FeedUrl::Parliament, &[148], None).await {
            Err(Error::Xml(_)) => {}
            other => panic!("expected Xml error, got {:?}", other.map(|_| ())),
        }
    }
}
