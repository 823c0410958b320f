//! Run-scoped reconciliation context
//!
//! One `SyncContext` lives for exactly one top-level invocation. It carries
//! the shared connections plus the memoization maps that record which
//! entities have already been reconciled during this run, so an entity
//! reachable from several traversal paths (a person reached directly and
//! again through a vote casting's roll call) is fetched and diffed once.
//!
//! Nothing here survives the run; cross-run consistency comes from the
//! database alone.

use crate::db::committees::Committee;
use crate::db::issues::Issue;
use crate::db::parliaments::Parliament;
use crate::db::persons::Person;
use crate::feed::{FeedClient, FeedUrl};
use althingi_common::config::Settings;
use althingi_common::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

/// Write counters for one run. The added/updated/unchanged trichotomy is
/// what the log lines report; tests assert on it directly (a second run
/// over unchanged upstream data must show zero writes).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub deleted: u64,
}

impl SyncStats {
    pub fn writes(&self) -> u64 {
        self.added + self.updated + self.deleted
    }
}

/// Context threaded through every reconciliation call.
pub struct SyncContext {
    pub pool: SqlitePool,
    pub feed: FeedClient,
    pub settings: Settings,
    pub stats: SyncStats,

    parliaments: HashMap<i64, Parliament>,
    persons: HashMap<i64, Person>,
    committees: HashMap<(i64, i64), Committee>,
    issues: HashMap<(i64, i64, char), Issue>,
    seats_done: HashSet<(i64, i64)>,
    committee_seats_done: HashSet<(i64, i64)>,
    minister_seats_done: HashSet<(i64, i64)>,
    parties_done: HashSet<i64>,
    constituencies_done: HashSet<i64>,
    categories_done: bool,

    /// Raw feed documents fetched more than once per run (the
    /// parliament-agnostic committee listing, per-parliament committee
    /// lists reached from many committees).
    xml: HashMap<String, String>,

    /// Next `order_in_issue` per issue id, in upstream traversal order.
    speech_order: HashMap<i64, i64>,
}

impl SyncContext {
    pub fn new(pool: SqlitePool, settings: Settings) -> Result<Self> {
        let feed = FeedClient::new(&settings)?;
        Ok(Self {
            pool,
            feed,
            settings,
            stats: SyncStats::default(),
            parliaments: HashMap::new(),
            persons: HashMap::new(),
            committees: HashMap::new(),
            issues: HashMap::new(),
            seats_done: HashSet::new(),
            committee_seats_done: HashSet::new(),
            minister_seats_done: HashSet::new(),
            parties_done: HashSet::new(),
            constituencies_done: HashSet::new(),
            categories_done: false,
            xml: HashMap::new(),
            speech_order: HashMap::new(),
        })
    }

    /// Reset every memoization map and the counters. Called at the start of
    /// each top-level invocation when a context is reused (tests, repeated
    /// driver runs in-process).
    pub fn clear(&mut self) {
        self.stats = SyncStats::default();
        self.parliaments.clear();
        self.persons.clear();
        self.committees.clear();
        self.issues.clear();
        self.seats_done.clear();
        self.committee_seats_done.clear();
        self.minister_seats_done.clear();
        self.parties_done.clear();
        self.constituencies_done.clear();
        self.categories_done = false;
        self.xml.clear();
        self.speech_order.clear();
    }

    /// Fetch a feed document through the run-scoped raw-XML memo.
    pub async fn fetch_memo(&mut self, url: FeedUrl, args: &[i64]) -> Result<String> {
        let key = format!("{}:{:?}", url.name(), args);
        if let Some(content) = self.xml.get(&key) {
            return Ok(content.clone());
        }

        let content = self.feed.fetch_xml(url, args, None).await?;
        self.xml.insert(key, content.clone());
        Ok(content)
    }

    pub fn cached_parliament(&self, parliament_num: i64) -> Option<&Parliament> {
        self.parliaments.get(&parliament_num)
    }

    pub fn cache_parliament(&mut self, parliament: Parliament) {
        self.parliaments.insert(parliament.parliament_num, parliament);
    }

    pub fn cached_person(&self, person_xml_id: i64) -> Option<&Person> {
        self.persons.get(&person_xml_id)
    }

    pub fn cache_person(&mut self, person: Person) {
        self.persons.insert(person.person_xml_id, person);
    }

    pub fn cached_committee(&self, parliament_num: i64, committee_xml_id: i64) -> Option<&Committee> {
        self.committees.get(&(parliament_num, committee_xml_id))
    }

    pub fn cache_committee(&mut self, parliament_num: i64, committee: Committee) {
        self.committees
            .insert((parliament_num, committee.committee_xml_id), committee);
    }

    pub fn cached_issue(&self, parliament_num: i64, issue_num: i64, group: char) -> Option<&Issue> {
        self.issues.get(&(parliament_num, issue_num, group))
    }

    pub fn cache_issue(&mut self, parliament_num: i64, group: char, issue: Issue) {
        self.issues
            .insert((parliament_num, issue.issue_num, group), issue);
    }

    pub fn seats_done(&mut self, parliament_num: i64, person_xml_id: i64) -> bool {
        !self.seats_done.insert((parliament_num, person_xml_id))
    }

    pub fn committee_seats_done(&mut self, parliament_num: i64, person_xml_id: i64) -> bool {
        !self
            .committee_seats_done
            .insert((parliament_num, person_xml_id))
    }

    pub fn minister_seats_done(&mut self, parliament_num: i64, person_xml_id: i64) -> bool {
        !self
            .minister_seats_done
            .insert((parliament_num, person_xml_id))
    }

    pub fn parties_done(&mut self, parliament_num: i64) -> bool {
        !self.parties_done.insert(parliament_num)
    }

    pub fn constituencies_done(&mut self, parliament_num: i64) -> bool {
        !self.constituencies_done.insert(parliament_num)
    }

    pub fn categories_done(&mut self) -> bool {
        std::mem::replace(&mut self.categories_done, true)
    }

    /// Next `order_in_issue` for a speech of the given issue. Seeded by the
    /// caller (0 on full runs, current local maximum on partial runs),
    /// then strictly increasing for the rest of the run.
    pub fn next_speech_order(&mut self, issue_id: i64, seed: i64) -> i64 {
        let counter = self.speech_order.entry(issue_id).or_insert(seed);
        *counter += 1;
        *counter
    }

    /// Whether a speech-order counter exists for the issue this run.
    pub fn has_speech_order(&self, issue_id: i64) -> bool {
        self.speech_order.contains_key(&issue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let pool = althingi_common::db::init_memory_pool().await.unwrap();
        let mut ctx = SyncContext::new(pool, Settings::default()).unwrap();

        ctx.stats.added = 3;
        assert!(!ctx.parties_done(148));
        assert!(ctx.parties_done(148));
        ctx.next_speech_order(1, 0);

        ctx.clear();
        assert_eq!(ctx.stats, SyncStats::default());
        assert!(!ctx.parties_done(148));
        assert!(!ctx.has_speech_order(1));
    }

    #[tokio::test]
    async fn test_speech_order_counter() {
        let pool = althingi_common::db::init_memory_pool().await.unwrap();
        let mut ctx = SyncContext::new(pool, Settings::default()).unwrap();

        assert_eq!(ctx.next_speech_order(7, 0), 1);
        assert_eq!(ctx.next_speech_order(7, 0), 2);
        // A partial run seeds from the stored maximum instead.
        assert_eq!(ctx.next_speech_order(8, 41), 42);
    }
}
