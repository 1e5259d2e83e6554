mod utils;
use utils::*;

use pacer::prelude::*;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_urls_at_ten_per_second() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let results = LoadTest::new([
        mock.url("/ok"),
        mock.url("/delay/ms/5"),
        mock.url("/status/200"),
    ])
    .rate(10.)
    .duration(Duration::from_secs(1))
    .seed(11)
    .await?;

    assert_eq!(results.issued, 10);
    assert_eq!(results.count(), 10);
    assert_eq!(results.succeeded(), 10);
    assert_eq!(results.errored(), 0);
    assert_eq!(results.planned_capacity, 20);
    assert_eq!(results.overflow, 0);
    assert!(results.outcomes.iter().all(|o| o.url_index < 3));
    assert!(results
        .outcomes
        .iter()
        .all(|o| o.response_latency >= Duration::ZERO && o.connect_latency >= Duration::ZERO));
    assert_eq!(mock.hits.get(), 10);

    let stats = RunStatistics::from_results(&results, None);
    assert_eq!(stats.connect.count, 10);
    assert!(stats.response.max >= stats.response.mean);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_200_is_recorded_as_failure() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let results = LoadTest::new([mock.url("/status/503")])
        .rate(20.)
        .duration(Duration::from_millis(500))
        .await?;

    assert_eq!(results.issued, 10);
    assert_eq!(results.count(), 10);
    assert_eq!(results.succeeded(), 0);
    assert_eq!(results.failed(), 10);
    assert!(results.outcomes.iter().all(|o| o.status == 503));

    let stats = RunStatistics::from_results(&results, None);
    assert_eq!(stats.failed, 10);
    assert_eq!(stats.response.count, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_url_list_launches_nothing() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let res = LoadTest::new(Vec::<String>::new())
        .rate(100.)
        .duration(Duration::from_secs(1))
        .await;

    assert!(matches!(res, Err(RunError::Config(ConfigError::NoUrls))));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.hits.get(), 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_responses_do_not_slow_issuance() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let results = LoadTest::new([mock.url("/delay/ms/400")])
        .rate(20.)
        .duration(Duration::from_millis(500))
        .await?;

    // A closed loop would have managed two requests in this window.
    assert_eq!(results.issued, 10);
    assert!(results.elapsed < Duration::from_millis(800));
    assert_eq!(results.succeeded(), 10);
    assert!(results
        .successes()
        .all(|o| o.response_latency >= Duration::from_millis(400)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stragglers_are_drained_before_return() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let results = LoadTest::new([mock.url("/delay/ms/300")])
        .rate(20.)
        .duration(Duration::from_millis(200))
        .await?;

    assert_eq!(results.issued, 4);
    assert_eq!(results.attempted(), 4);
    assert_eq!(results.count(), 4);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn attempt_deadline_reports_timeouts() -> anyhow::Result<()> {
    init();
    let mock = mock_service::spawn().await?;

    let results = LoadTest::new([mock.url("/delay/ms/2000")])
        .rate(10.)
        .duration(Duration::from_millis(300))
        .attempt_timeout(Duration::from_millis(200))
        .await?;

    assert_eq!(results.issued, 3);
    assert_eq!(results.count(), 0);
    assert_eq!(results.errors.timeout, 3);

    Ok(())
}
