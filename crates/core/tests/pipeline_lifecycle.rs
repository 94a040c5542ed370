//! End-to-end pipeline runs against an in-process archive serving listing
//! fixtures, with an in-memory catalog and mock index/provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse};
use axum::Router;
use url::Url;

use romshelf_core::catalog::{EnrichedFields, GameCatalog, NewGameRecord, SqliteCatalog};
use romshelf_core::config::PipelineConfig;
use romshelf_core::index::SearchIndex;
use romshelf_core::metadata::GameMetadata;
use romshelf_core::pipeline::{Pipeline, PipelineMode, PipelineStatus};
use romshelf_core::testing::{MockMetadataProvider, MockSearchIndex};

/// Serve a map of raw request paths to HTML bodies on an ephemeral port.
async fn serve_fixture(pages: HashMap<String, String>) -> String {
    let pages = Arc::new(pages);
    let app = Router::new().fallback(move |uri: Uri| {
        let pages = Arc::clone(&pages);
        async move {
            match pages.get(uri.path()) {
                Some(body) => Html(body.clone()).into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn listing(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(href, size)| {
            format!(
                "<tr><td><a href=\"{href}\">{href}</a></td><td class=\"size\">{size}</td></tr>\n"
            )
        })
        .collect();
    format!(
        "<html><body><h1>Index</h1><table>\n\
         <tr><td><a href=\"../\">Parent Directory</a></td><td class=\"size\">-</td></tr>\n\
         <tr><td><a href=\"?C=N;O=D\">Name</a></td><td class=\"size\">-</td></tr>\n\
         {body}</table></body></html>"
    )
}

struct TestHarness {
    catalog: Arc<SqliteCatalog>,
    index: Arc<MockSearchIndex>,
    provider: Arc<MockMetadataProvider>,
    pipeline: Arc<Pipeline>,
}

fn harness(base: &str, config: PipelineConfig) -> TestHarness {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let index = Arc::new(MockSearchIndex::new());
    let provider = Arc::new(MockMetadataProvider::new());

    let pipeline = Arc::new(Pipeline::new(
        config,
        Url::parse(base).unwrap(),
        catalog.clone() as Arc<dyn GameCatalog>,
        index.clone(),
        Some(provider.clone() as Arc<dyn romshelf_core::metadata::MetadataProvider>),
    ));

    TestHarness {
        catalog,
        index,
        provider,
        pipeline,
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        enrich_worker_delay_ms: 20,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_single_file_crawl_parses_and_enriches() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[("CONSOLE/", "-")]),
    );
    pages.insert(
        "/files/CONSOLE/".to_string(),
        listing(&[("Nintendo%20NES/", "-")]),
    );
    pages.insert(
        "/files/CONSOLE/Nintendo%20NES/".to_string(),
        listing(&[("Super%20Mario%20Bros.%20%28USA%29.nes", "40 KB")]),
    );
    let host = serve_fixture(pages).await;
    let base = format!("{host}/files/");

    let h = harness(&base, fast_config());
    h.provider
        .set_hit(
            "Super Mario Bros.",
            GameMetadata {
                summary: Some("A plumber runs right.".to_string()),
                rating: Some(87.0),
                ..GameMetadata::default()
            },
        )
        .await;

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    let snapshot = h.pipeline.snapshot();
    assert_eq!(snapshot.status, PipelineStatus::Done);
    assert_eq!(snapshot.scrape_total, 1);
    assert_eq!(snapshot.scrape_new, 1);
    assert_eq!(snapshot.enriched, 1);
    assert_eq!(snapshot.indexed, 1);
    assert!(snapshot.scrape_complete);

    let urls = h.catalog.all_urls().unwrap();
    assert_eq!(
        urls,
        vec![format!(
            "{host}/files/CONSOLE/Nintendo%20NES/Super%20Mario%20Bros.%20%28USA%29.nes"
        )]
    );

    let game = h.catalog.get_by_ids(&[1]).unwrap().pop().unwrap();
    assert_eq!(game.filename, "Super Mario Bros. (USA).nes");
    assert_eq!(game.game_name, "Super Mario Bros.");
    assert_eq!(game.tags, vec!["USA"]);
    assert_eq!(game.region, "USA");
    assert_eq!(game.size, "40 KB");
    assert_eq!(game.platform, "Nintendo NES");
    assert_eq!(game.group_name, "CONSOLE");
    assert_eq!(game.description.as_deref(), Some("A plumber runs right."));
    assert_eq!(game.rating, Some(4.35));

    assert_eq!(h.index.document_count().await.unwrap(), 1);
    let doc = h.index.document(game.id).await.unwrap();
    assert_eq!(doc.description.as_deref(), Some("A plumber runs right."));
}

#[tokio::test]
async fn test_non_game_is_stored_and_indexed_but_never_enriched() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[
            ("Final%20Fantasy%20VII%20%28Manual%29.pdf", "2 MB"),
        ]),
    );
    let host = serve_fixture(pages).await;

    let h = harness(&format!("{host}/files/"), fast_config());
    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    assert_eq!(h.provider.lookup_count().await, 0);
    let snapshot = h.pipeline.snapshot();
    assert_eq!(snapshot.scrape_total, 1);
    assert_eq!(snapshot.scrape_new, 0);
    assert_eq!(snapshot.enriched, 0);

    let game = h.catalog.get_by_ids(&[1]).unwrap().pop().unwrap();
    assert_eq!(game.filename, "Final Fantasy VII (Manual).pdf");
    assert!(game.description.is_none());

    // Filtered records still reach the index with their crawl fields
    assert_eq!(h.index.document_ids().await, vec![game.id]);
}

#[tokio::test]
async fn test_conflict_upsert_preserves_enrichment() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[("Mega%20Man%20%28USA%29.nes", "128 KB")]),
    );
    let host = serve_fixture(pages).await;
    let url = format!("{host}/files/Mega%20Man%20%28USA%29.nes");

    let h = harness(&format!("{host}/files/"), fast_config());

    // Pre-seed the same URL, already enriched, with a stale region
    let rows = h
        .catalog
        .batch_upsert(&[NewGameRecord {
            download_url: url.clone(),
            game_name: "Mega Man".to_string(),
            filename: "Mega Man (USA).nes".to_string(),
            platform: String::new(),
            group_name: String::new(),
            region: "Japan".to_string(),
            size: String::new(),
            tags: vec![],
        }])
        .unwrap();
    let id = rows[0].id;
    h.catalog
        .update_enrichment(
            id,
            &EnrichedFields {
                description: Some("lore".to_string()),
                ..EnrichedFields::default()
            },
        )
        .unwrap();

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    // Already enriched, so the provider is never asked again
    assert_eq!(h.provider.lookup_count().await, 0);

    let game = h.catalog.get_by_ids(&[id]).unwrap().pop().unwrap();
    assert_eq!(game.id, id);
    assert_eq!(game.region, "USA");
    assert_eq!(game.size, "128 KB");
    assert_eq!(game.description.as_deref(), Some("lore"));
}

#[tokio::test]
async fn test_incremental_prune_removes_unseen_urls() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[("Kept%20Game%20%28USA%29.nes", "1 MB")]),
    );
    let host = serve_fixture(pages).await;
    let kept_url = format!("{host}/files/Kept%20Game%20%28USA%29.nes");
    let stale_url = format!("{host}/files/Removed%20Game%20%28USA%29.nes");

    let h = harness(&format!("{host}/files/"), fast_config());
    h.catalog
        .batch_upsert(&[
            NewGameRecord {
                download_url: kept_url.clone(),
                game_name: "Kept Game".to_string(),
                filename: "Kept Game (USA).nes".to_string(),
                platform: String::new(),
                group_name: String::new(),
                region: "USA".to_string(),
                size: String::new(),
                tags: vec!["USA".to_string()],
            },
            NewGameRecord {
                download_url: stale_url,
                game_name: "Removed Game".to_string(),
                filename: "Removed Game (USA).nes".to_string(),
                platform: String::new(),
                group_name: String::new(),
                region: "USA".to_string(),
                size: String::new(),
                tags: vec!["USA".to_string()],
            },
        ])
        .unwrap();

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    // Every URL left in the store was observed by this crawl
    assert_eq!(h.catalog.all_urls().unwrap(), vec![kept_url]);
}

#[tokio::test]
async fn test_clean_mode_wipes_then_rebuilds_both_stores() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[
            ("Game%20A%20%28USA%29.nes", "1 MB"),
            ("Game%20B%20%28Japan%29.nes", "2 MB"),
        ]),
    );
    let host = serve_fixture(pages).await;

    let h = harness(&format!("{host}/files/"), fast_config());
    // Stale content in both stores from a previous life
    h.catalog
        .batch_upsert(&[NewGameRecord {
            download_url: "https://old.example/gone.nes".to_string(),
            game_name: "Gone".to_string(),
            filename: "Gone.nes".to_string(),
            platform: String::new(),
            group_name: String::new(),
            region: String::new(),
            size: String::new(),
            tags: vec![],
        }])
        .unwrap();

    h.pipeline.run(PipelineMode::Clean).await.unwrap();

    let stats = h.catalog.stats().unwrap();
    assert_eq!(stats.total_games, 2);
    // Clean-mode law: document count equals row count
    assert_eq!(h.index.document_count().await.unwrap(), 2);
    assert!(!h
        .catalog
        .all_urls()
        .unwrap()
        .contains(&"https://old.example/gone.nes".to_string()));

    // All misses: rows carry the attempted sentinel
    let games = h.catalog.get_by_ids(&[2, 3]).unwrap();
    assert_eq!(games.len(), 2);
    assert!(games.iter().all(|g| g.description.as_deref() == Some("")));
}

#[tokio::test]
async fn test_second_incremental_run_is_idempotent_and_quiet() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[
            ("Game%20A%20%28USA%29.nes", "1 MB"),
            ("Game%20B%20%28Japan%29.nes", "2 MB"),
        ]),
    );
    let host = serve_fixture(pages).await;

    let h = harness(&format!("{host}/files/"), fast_config());

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();
    let first_urls = h.catalog.all_urls().unwrap();
    let first_lookups = h.provider.lookup_count().await;
    assert!(first_lookups > 0);
    let first_ids: Vec<i64> = h.index.document_ids().await;

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    // Same rows, same ids, zero provider calls on enriched records
    assert_eq!(h.catalog.all_urls().unwrap(), first_urls);
    assert_eq!(h.index.document_ids().await, first_ids);
    assert_eq!(h.provider.lookup_count().await, first_lookups);
    assert_eq!(h.pipeline.snapshot().scrape_new, 0);
}

#[tokio::test]
async fn test_auth_failure_degrades_to_scrape_only() {
    let mut pages = HashMap::new();
    pages.insert(
        "/files/".to_string(),
        listing(&[("Game%20A%20%28USA%29.nes", "1 MB")]),
    );
    let host = serve_fixture(pages).await;

    let h = harness(&format!("{host}/files/"), fast_config());
    h.provider.fail_auth();

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();

    let snapshot = h.pipeline.snapshot();
    assert_eq!(snapshot.status, PipelineStatus::Done);
    assert_eq!(snapshot.scrape_total, 1);
    assert_eq!(snapshot.enriched, 0);
    assert!(snapshot.scrape_complete);
    assert_eq!(h.provider.lookup_count().await, 0);
    // The record is stored but never marked as attempted
    let game = h.catalog.get_by_ids(&[1]).unwrap().pop().unwrap();
    assert!(game.description.is_none());
}

#[tokio::test]
async fn test_cancellation_during_enrichment_ends_idle() {
    let rows: Vec<(String, &str)> = (0..100)
        .map(|i| (format!("Game%20{i:03}%20%28USA%29.nes"), "1 MB"))
        .collect();
    let row_refs: Vec<(&str, &str)> = rows.iter().map(|(h, s)| (h.as_str(), *s)).collect();
    let mut pages = HashMap::new();
    pages.insert("/files/".to_string(), listing(&row_refs));
    let host = serve_fixture(pages).await;

    let h = harness(
        &format!("{host}/files/"),
        PipelineConfig {
            enrich_worker_delay_ms: 200,
            ..PipelineConfig::default()
        },
    );
    h.provider
        .set_lookup_delay(Duration::from_millis(300))
        .await;

    h.pipeline.start(PipelineMode::Incremental).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    h.pipeline.stop().unwrap();

    let deadline = Instant::now() + Duration::from_millis(2500);
    while h.pipeline.status() == PipelineStatus::Running {
        assert!(Instant::now() < deadline, "cancellation did not land in time");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let snapshot = h.pipeline.snapshot();
    assert_eq!(snapshot.status, PipelineStatus::Idle);
    assert!(snapshot.cancelled);
    assert!(snapshot.enriched < 100);
    assert!(snapshot.ended_at.is_some());

    // No half-written state: every row marked attempted is also indexed
    let all_ids: Vec<i64> = (1..=100).collect();
    let indexed = h.index.document_ids().await;
    for game in h.catalog.get_by_ids(&all_ids).unwrap() {
        if game.description.is_some() {
            assert!(
                indexed.contains(&game.id),
                "row {} enriched but not indexed",
                game.id
            );
        }
    }
}

#[tokio::test]
async fn test_enrichment_stays_inside_the_request_budget() {
    let rows: Vec<(String, &str)> = (0..12)
        .map(|i| (format!("Game%20{i:02}%20%28USA%29.nes"), "1 MB"))
        .collect();
    let row_refs: Vec<(&str, &str)> = rows.iter().map(|(h, s)| (h.as_str(), *s)).collect();
    let mut pages = HashMap::new();
    pages.insert("/files/".to_string(), listing(&row_refs));
    let host = serve_fixture(pages).await;

    // Batch size 1 so the pool makes one provider call per record
    let h = harness(
        &format!("{host}/files/"),
        PipelineConfig {
            enrich_batch_size: 1,
            enrich_worker_delay_ms: 400,
            ..PipelineConfig::default()
        },
    );

    h.pipeline.run(PipelineMode::Incremental).await.unwrap();
    assert_eq!(h.pipeline.snapshot().enriched, 12);

    // With a 400 ms per-worker delay and 4 staggered workers, any window of
    // one delay length should see at most workers + 1 calls
    let lookups = h.provider.recorded_lookups().await;
    assert_eq!(lookups.len(), 12);
    let times: Vec<Instant> = lookups.iter().map(|l| l.at).collect();
    let window = Duration::from_millis(400);
    for (i, start) in times.iter().enumerate() {
        let in_window = times[i..]
            .iter()
            .filter(|t| t.duration_since(*start) < window)
            .count();
        assert!(
            in_window <= 5,
            "{in_window} provider calls within one delay window"
        );
    }
}
