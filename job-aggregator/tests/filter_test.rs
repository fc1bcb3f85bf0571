use chrono::NaiveDate;
use job_aggregator::filter::contains_phrase;
use job_aggregator::{FilterOutcome, JobRecord, JobSource, KeywordConfig, RejectReason, RelevanceFilter, ScoreBreakdown};

fn keywords(include: &[&str], exclude: &[&str]) -> KeywordConfig {
    KeywordConfig::new(
        include.iter().map(|s| s.to_string()).collect(),
        exclude.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

fn job(id: &str, title: &str, description: Option<&str>) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        url: format!("https://jobs.example.com/{}", id),
        description: description.map(str::to_string),
        posted_date: None,
        scraped_date: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
        source: JobSource::Greenhouse,
        salary: None,
        relevance_score: 0,
        score_breakdown: ScoreBreakdown::new(),
    }
}

#[test]
fn test_single_include_match_scores_one() {
    let filter = RelevanceFilter::new(keywords(&["UI/UX"], &[]));

    match filter.evaluate(job("1", "UI/UX Design Intern", None)) {
        FilterOutcome::Accepted(record) => {
            assert_eq!(record.relevance_score, 1);
            let expected: ScoreBreakdown = [("UI/UX", 1)].into_iter().collect();
            assert_eq!(record.score_breakdown, expected);
        }
        FilterOutcome::Rejected(reason) => panic!("unexpected rejection: {}", reason),
    }
}

#[test]
fn test_exclude_wins_over_include() {
    let filter = RelevanceFilter::new(keywords(&["UI/UX"], &["Senior"]));

    assert_eq!(
        filter.evaluate(job("1", "Senior UI/UX Designer", None)),
        FilterOutcome::Rejected(RejectReason::Excluded {
            phrase: "Senior".to_string()
        })
    );
}

#[test]
fn test_exclude_applies_to_description() {
    let filter = RelevanceFilter::new(keywords(&["UX"], &["full-time"]));

    let outcome = filter.evaluate(job("1", "UX Intern", Some("This is a Full-Time role.")));
    assert!(matches!(outcome, FilterOutcome::Rejected(RejectReason::Excluded { .. })));
}

#[test]
fn test_no_include_match_is_rejected() {
    let filter = RelevanceFilter::new(keywords(&["UI/UX", "product design"], &[]));

    assert_eq!(
        filter.evaluate(job("1", "Backend Engineering Intern", Some("Rust and Postgres"))),
        FilterOutcome::Rejected(RejectReason::NoIncludeMatch)
    );
}

#[test]
fn test_phrases_match_on_word_boundaries() {
    assert!(contains_phrase("ux design intern", "ux"));
    assert!(contains_phrase("senior ui/ux-focused designer", "ui/ux"));
    assert!(contains_phrase("product design systems", "product design"));
    assert!(!contains_phrase("internal tools engineer", "intern"));
    assert!(!contains_phrase("linux admin", "ux"));
    assert!(!contains_phrase("anything", ""));
}

#[test]
fn test_breakdown_sums_weighted_phrases() {
    let mut config = keywords(&["UI/UX", "product design", "figma"], &[]);
    config.weights.insert("UI/UX".to_string(), 3);
    let filter = RelevanceFilter::new(config.validate().unwrap());

    let record = match filter.evaluate(job(
        "1",
        "UI/UX Intern",
        Some("Work on PRODUCT  design systems in Figma."),
    )) {
        FilterOutcome::Accepted(record) => record,
        FilterOutcome::Rejected(reason) => panic!("unexpected rejection: {}", reason),
    };

    assert_eq!(record.score_breakdown.get("UI/UX"), Some(3));
    assert_eq!(record.score_breakdown.get("product design"), Some(1));
    assert_eq!(record.score_breakdown.get("figma"), Some(1));
    assert_eq!(record.relevance_score, 5);
    assert_eq!(record.relevance_score, record.score_breakdown.total());
}

#[test]
fn test_minimum_score_and_required_phrases() {
    let mut config = keywords(&["UX", "design"], &[]);
    config.minimum_score = 2;
    let filter = RelevanceFilter::new(config.validate().unwrap());

    assert_eq!(
        filter.evaluate(job("1", "UX Intern", None)),
        FilterOutcome::Rejected(RejectReason::BelowThreshold { score: 1, minimum: 2 })
    );
    assert!(matches!(
        filter.evaluate(job("2", "UX Design Intern", None)),
        FilterOutcome::Accepted(_)
    ));

    let gated = RelevanceFilter::new(
        keywords(&["UX"], &[])
            .with_require_any(vec!["intern".to_string(), "internship".to_string()])
            .unwrap(),
    );
    assert_eq!(
        gated.evaluate(job("3", "UX Designer", None)),
        FilterOutcome::Rejected(RejectReason::MissingRequired)
    );
    assert!(matches!(gated.evaluate(job("4", "UX Internship", None)), FilterOutcome::Accepted(_)));
}

#[test]
fn test_apply_keeps_order_and_counts_reasons() {
    let filter = RelevanceFilter::new(keywords(&["UX"], &["senior"]));

    let batch = vec![
        job("1", "UX Intern", None),
        job("2", "Senior UX Designer", None),
        job("3", "Data Intern", None),
        job("4", "UX Research Intern", None),
    ];

    let (accepted, stats) = filter.apply(batch);

    let ids: Vec<&str> = accepted.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "4"]);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.rejected_for("excluded"), 1);
    assert_eq!(stats.rejected_for("no_include_match"), 1);
    assert_eq!(stats.total_rejected(), 2);
}
