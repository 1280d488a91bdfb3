//! Fan leaderboard service.

use crate::error::ClientResult;
use crate::http::ApiClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name shown for rows without a display name.
pub const ANONYMOUS: &str = "Anonymous";

/// Leaderboard time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Today only.
    Today,
    /// The current week.
    #[default]
    Week,
    /// The current month.
    Month,
    /// All time.
    All,
}

/// Sort column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Rank.
    #[default]
    Rank,
    /// Points.
    Points,
    /// Streak length.
    Streak,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Query for one leaderboard page.
///
/// Serialized directly as the request's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    /// Time window.
    pub timeframe: Timeframe,
    /// Sort column.
    pub sort: SortField,
    /// Sort direction.
    pub dir: SortDir,
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Optional name filter. Empty filters are not sent.
    #[serde(default, skip_serializing_if = "is_blank")]
    pub search: Option<String>,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            sort: SortField::default(),
            dir: SortDir::default(),
            page: 1,
            page_size: 25,
            search: None,
        }
    }
}

impl LeaderboardQuery {
    /// Create a query for the first page with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time window.
    #[must_use]
    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Set the sort column and direction.
    #[must_use]
    pub fn sort(mut self, sort: SortField, dir: SortDir) -> Self {
        self.sort = sort;
        self.dir = dir;
        self
    }

    /// Set the page and page size.
    #[must_use]
    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Set the name filter.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// One row of a leaderboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,
    /// Rank in the current window.
    pub rank: u32,
    /// Points in the current window.
    pub points: i64,
    /// Consecutive active days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<u32>,
    /// Last activity, ISO 8601.
    #[serde(default)]
    pub last_active_iso: String,
}

/// A page of leaderboard rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    /// Rows on this page.
    pub rows: Vec<LeaderboardRow>,
    /// Total rows across all pages.
    pub total: u64,
    /// Page number.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
}

/// A top-N entry, normalized from the loosely shaped `/leaderboard?limit=` feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanRow {
    /// `sub`, falling back to email, then rank.
    pub id: String,
    /// Display name, or [`ANONYMOUS`].
    pub name: String,
    /// Score.
    pub points: i64,
    /// Rank.
    pub rank: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTopEntry {
    #[serde(default)]
    rank: u32,
    display_name: Option<String>,
    name: Option<String>,
    score: Option<i64>,
    points: Option<i64>,
    email: Option<String>,
    sub: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTop {
    #[serde(default)]
    top: Vec<RawTopEntry>,
}

impl From<RawTopEntry> for FanRow {
    fn from(raw: RawTopEntry) -> Self {
        let id = first_present([raw.sub, raw.email]).unwrap_or_else(|| raw.rank.to_string());
        let name = first_present([raw.display_name, raw.name])
            .unwrap_or_else(|| ANONYMOUS.to_string());
        Self {
            id,
            name,
            points: raw.score.or(raw.points).unwrap_or(0),
            rank: raw.rank,
        }
    }
}

fn first_present<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values.into_iter().flatten().find(|v| !v.is_empty())
}

/// The caller's own standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyRank {
    /// Rank, `None` when the user has no activity yet.
    pub rank: Option<u32>,
    /// Score.
    #[serde(default)]
    pub score: i64,
}

/// Leaderboard API client.
#[derive(Debug, Clone)]
pub struct LeaderboardClient {
    api: ApiClient,
}

impl LeaderboardClient {
    /// Create a leaderboard client on top of an API client.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch one page.
    pub async fn page(&self, query: &LeaderboardQuery) -> ClientResult<LeaderboardPage> {
        self.api
            .get_json_with_query("leaderboard", query)
            .await
    }

    /// Fetch the top `limit` fans.
    pub async fn top(&self, limit: u32) -> ClientResult<Vec<FanRow>> {
        let raw: RawTop = self
            .api
            .get_json_with_query("leaderboard", &[("limit", limit)])
            .await?;
        Ok(raw.top.into_iter().map(FanRow::from).collect())
    }

    /// Fetch the caller's rank.
    ///
    /// Returns `None` without a request when signed out, and `None` when the
    /// API refuses the stored token.
    pub async fn me(&self) -> ClientResult<Option<MyRank>> {
        if self.api.session().id_token().is_none() {
            debug!("Not signed in; skipping rank lookup");
            return Ok(None);
        }
        match self.api.get_json::<MyRank>("me").await {
            Ok(rank) => Ok(Some(rank)),
            Err(e) if e.is_unauthorized() => {
                debug!(status = ?e.status(), "Rank lookup refused");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl From<ApiClient> for LeaderboardClient {
    fn from(api: ApiClient) -> Self {
        Self::new(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session, session_with_token};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn leaderboard(server: &MockServer, session: lala_auth::SessionManager) -> LeaderboardClient {
        let base = Url::parse(&format!("{}/prod/", server.uri())).unwrap();
        LeaderboardClient::new(ApiClient::new(base, session))
    }

    #[test]
    fn test_query_serializes_wire_names() {
        let query = LeaderboardQuery::new()
            .timeframe(Timeframe::All)
            .sort(SortField::Points, SortDir::Desc)
            .page(2, 50)
            .search("ava");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "timeframe": "all",
                "sort": "points",
                "dir": "desc",
                "page": 2,
                "pageSize": 50,
                "search": "ava",
            })
        );

        let blank = serde_json::to_value(LeaderboardQuery::new().search("")).unwrap();
        assert!(blank.get("search").is_none());
    }

    #[rstest]
    #[case(json!({ "rank": 1, "sub": "s1", "email": "a@x.com", "displayName": "Ava", "score": 90 }), "s1", "Ava", 90)]
    #[case(json!({ "rank": 2, "email": "b@x.com", "name": "Bo", "points": 40 }), "b@x.com", "Bo", 40)]
    #[case(json!({ "rank": 3 }), "3", "Anonymous", 0)]
    #[case(json!({ "rank": 4, "sub": "", "displayName": "", "score": 5, "points": 7 }), "4", "Anonymous", 5)]
    fn test_top_entry_normalization(
        #[case] raw: serde_json::Value,
        #[case] id: &str,
        #[case] name: &str,
        #[case] points: i64,
    ) {
        let entry: RawTopEntry = serde_json::from_value(raw).unwrap();
        let row = FanRow::from(entry);
        assert_eq!(row.id, id);
        assert_eq!(row.name, name);
        assert_eq!(row.points, points);
    }

    #[tokio::test]
    async fn test_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prod/leaderboard"))
            .and(query_param("timeframe", "week"))
            .and(query_param("sort", "rank"))
            .and(query_param("dir", "asc"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", "25"))
            .and(query_param_is_missing("search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [{
                    "userId": "u1",
                    "displayName": "Ava",
                    "avatarUrl": "https://cdn.example.com/a.png",
                    "rank": 1,
                    "points": 120,
                    "streakDays": 4,
                    "lastActiveIso": "2024-05-01T10:00:00Z"
                }],
                "total": 1,
                "page": 1,
                "pageSize": 25
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = leaderboard(&server, session())
            .page(&LeaderboardQuery::new().search(""))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].display_name, "Ava");
        assert_eq!(page.rows[0].streak_days, Some(4));
    }

    #[tokio::test]
    async fn test_top() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prod/leaderboard"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "top": [
                    { "rank": 1, "sub": "s1", "displayName": "Ava", "score": 90 },
                    { "rank": 2, "email": "b@x.com", "score": 40 }
                ]
            })))
            .mount(&server)
            .await;

        let rows = leaderboard(&server, session()).top(2).await.unwrap();
        assert_eq!(
            rows,
            vec![
                FanRow {
                    id: "s1".into(),
                    name: "Ava".into(),
                    points: 90,
                    rank: 1
                },
                FanRow {
                    id: "b@x.com".into(),
                    name: ANONYMOUS.into(),
                    points: 40,
                    rank: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_top_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = leaderboard(&server, session()).top(5).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_me_signed_out_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let me = leaderboard(&server, session()).me().await.unwrap();
        assert_eq!(me, None);
    }

    #[tokio::test]
    async fn test_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prod/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "rank": 7, "score": 310 })),
            )
            .mount(&server)
            .await;

        let me = leaderboard(&server, session_with_token("tok")).me().await.unwrap();
        assert_eq!(
            me,
            Some(MyRank {
                rank: Some(7),
                score: 310
            })
        );
    }

    #[tokio::test]
    async fn test_me_refused_token_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let me = leaderboard(&server, session_with_token("expired"))
            .me()
            .await
            .unwrap();
        assert_eq!(me, None);
    }
}
