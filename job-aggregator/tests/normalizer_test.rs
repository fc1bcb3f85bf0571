use chrono::NaiveDate;
use job_aggregator::normalizer::{format_salary_range, normalize_url, parse_posted_date};
use job_aggregator::utils::html::{to_plain_text, unescape_markup};
use job_aggregator::{
    AshbyJob, AshbyLocation, FilterOutcome, GreenhouseJob, GreenhouseLocation, InvalidReason, JobSource,
    KeywordConfig, LeverCategories, LeverPosting, LeverSalaryRange, MuseJob, MuseNamed, MuseRefs, Normalizer,
    RawRecord, RelevanceFilter, RemoteOkJob, RssEntry, WorkableJob,
};
use std::sync::Once;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn greenhouse_job() -> GreenhouseJob {
    GreenhouseJob {
        id: Some(123),
        title: Some("Product  Design Intern".to_string()),
        absolute_url: Some("https://boards.greenhouse.io/figma/jobs/123?gh_src=abc".to_string()),
        content: Some("&lt;p&gt;Design &amp;amp; research&lt;/p&gt;".to_string()),
        updated_at: None,
        first_published: Some("2025-11-05T12:00:00-05:00".to_string()),
        location: Some(GreenhouseLocation {
            name: Some("San Francisco, CA".to_string()),
        }),
        company_name: "Figma".to_string(),
    }
}

#[test]
fn test_tracking_parameters_are_stripped() {
    assert_eq!(normalize_url("https://x.com/job/1?utm_source=a").unwrap(), "https://x.com/job/1");
    assert_eq!(
        normalize_url("https://Jobs.Example.com/a?gh_jid=42&utm_medium=x&ref=feed#apply").unwrap(),
        "https://jobs.example.com/a?gh_jid=42"
    );
    assert_eq!(
        normalize_url("  https://jobs.lever.co/acme/abc?lever-source=linkedin  ").unwrap(),
        "https://jobs.lever.co/acme/abc"
    );
}

#[test]
fn test_unusable_urls_are_invalid() {
    assert_eq!(normalize_url(""), Err(InvalidReason::MissingUrl));
    assert!(matches!(normalize_url("not a url"), Err(InvalidReason::MalformedUrl(_))));
    assert!(matches!(normalize_url("ftp://x.com/job"), Err(InvalidReason::MalformedUrl(_))));
    assert!(matches!(normalize_url("mailto:jobs@x.com"), Err(InvalidReason::MalformedUrl(_))));
}

#[test]
fn test_relative_dates() {
    let today = day(2025, 11, 20);

    assert_eq!(parse_posted_date("Today", today), Some(today));
    assert_eq!(parse_posted_date("just posted", today), Some(today));
    assert_eq!(parse_posted_date("yesterday", today), Some(day(2025, 11, 19)));
    assert_eq!(parse_posted_date("3d ago", today), Some(day(2025, 11, 17)));
    assert_eq!(parse_posted_date("2w ago", today), Some(day(2025, 11, 6)));
    assert_eq!(parse_posted_date("Posted 1 month ago", today), Some(day(2025, 10, 20)));
    assert_eq!(parse_posted_date("30+ days ago", today), Some(day(2025, 10, 21)));
    assert_eq!(parse_posted_date("5h ago", today), Some(today));
    assert_eq!(parse_posted_date("1 year ago", today), Some(day(2024, 11, 20)));
}

#[test]
fn test_absolute_and_unparsable_dates() {
    let today = day(2025, 11, 20);

    assert_eq!(parse_posted_date("2025-11-05", today), Some(day(2025, 11, 5)));
    assert_eq!(parse_posted_date("2025-11-05T12:00:00Z", today), Some(day(2025, 11, 5)));
    assert_eq!(parse_posted_date("2025-11-05T12:00:00", today), Some(day(2025, 11, 5)));
    assert_eq!(parse_posted_date("Wed, 05 Nov 2025 10:00:00 +0000", today), Some(day(2025, 11, 5)));
    assert_eq!(parse_posted_date("Nov 05, 2025", today), Some(day(2025, 11, 5)));
    assert_eq!(parse_posted_date("sometime soon", today), None);
    assert_eq!(parse_posted_date("   ", today), None);
}

#[test]
fn test_salary_formatting() {
    assert_eq!(format_salary_range(Some(20.0), Some(30.0)).as_deref(), Some("$20 - $30/hr"));
    assert_eq!(format_salary_range(Some(80_000.0), None).as_deref(), Some("$80,000/yr"));
    assert_eq!(format_salary_range(Some(90_000.0), Some(90_000.0)).as_deref(), Some("$90,000/yr"));
    assert_eq!(format_salary_range(Some(0.0), None), None);
    assert_eq!(format_salary_range(None, None), None);
}

#[test]
fn test_greenhouse_record() {
    init_tracing();

    let normalizer = Normalizer::new(day(2025, 11, 20));
    let record = normalizer
        .normalize("greenhouse", &RawRecord::Greenhouse(greenhouse_job()))
        .unwrap();

    assert_eq!(record.id, "greenhouse_123");
    assert_eq!(record.title, "Product Design Intern");
    assert_eq!(record.company, "Figma");
    assert_eq!(record.location, "San Francisco, CA");
    assert_eq!(record.url, "https://boards.greenhouse.io/figma/jobs/123");
    assert_eq!(record.description.as_deref(), Some("Design & research"));
    assert_eq!(record.posted_date, Some(day(2025, 11, 5)));
    assert_eq!(record.scraped_date, day(2025, 11, 20));
    assert_eq!(record.source, JobSource::Greenhouse);
    assert_eq!(record.relevance_score, 0);
    assert!(record.score_breakdown.is_empty());
}

#[test]
fn test_lever_record() {
    let posting = LeverPosting {
        id: Some("abc-123".to_string()),
        text: Some("UX Research Intern".to_string()),
        hosted_url: Some("https://jobs.lever.co/acme/abc-123".to_string()),
        description_plain: Some("Help us study users.".to_string()),
        created_at: Some(1_730_764_800_000),
        categories: Some(LeverCategories {
            location: Some("New York, NY".to_string()),
            team: Some("Design".to_string()),
            commitment: Some("Internship".to_string()),
        }),
        salary_range: Some(LeverSalaryRange {
            min: Some(25.0),
            max: Some(35.0),
            currency: Some("USD".to_string()),
            interval: Some("per-hour-wage".to_string()),
        }),
        company_name: "Acme".to_string(),
        ..Default::default()
    };

    let record = Normalizer::new(day(2025, 11, 20))
        .normalize("lever", &RawRecord::Lever(posting))
        .unwrap();

    assert_eq!(record.id, "lever_abc-123");
    assert_eq!(record.salary.as_deref(), Some("$25 - $35/hr"));
    assert_eq!(record.posted_date, Some(day(2024, 11, 5)));
    assert_eq!(record.location, "New York, NY");
    assert_eq!(record.description.as_deref(), Some("Help us study users."));
}

#[test]
fn test_remoteok_defaults() {
    let job = RemoteOkJob {
        id: Some(serde_json::json!(98765)),
        position: Some("Product Designer Intern".to_string()),
        company: Some("Remotely".to_string()),
        location: Some("false".to_string()),
        url: Some("https://remoteok.com/remote-jobs/98765".to_string()),
        epoch: Some(1_762_300_800),
        tags: vec!["design".to_string()],
        ..Default::default()
    };

    let record = Normalizer::new(day(2025, 11, 20))
        .normalize("remoteok", &RawRecord::RemoteOk(job))
        .unwrap();

    assert_eq!(record.id, "remoteok_98765");
    assert_eq!(record.location, "Remote");
    assert_eq!(record.posted_date, Some(day(2025, 11, 5)));
    assert_eq!(record.salary, None);
}

#[test]
fn test_rss_company_from_title() {
    let entry = RssEntry {
        feed_name: "We Work Remotely".to_string(),
        title: Some("Acme: UX Design Intern".to_string()),
        link: Some("https://weworkremotely.com/jobs/acme-ux?utm_campaign=rss".to_string()),
        ..Default::default()
    };

    let normalizer = Normalizer::new(day(2025, 11, 20));
    let first = normalizer.normalize("rss", &RawRecord::Rss(entry.clone())).unwrap();
    let second = normalizer.normalize("rss", &RawRecord::Rss(entry)).unwrap();

    assert_eq!(first.company, "Acme");
    assert_eq!(first.title, "UX Design Intern");
    assert_eq!(first.url, "https://weworkremotely.com/jobs/acme-ux");
    assert!(first.id.starts_with("rss_"));
    assert_eq!(first.id.len(), "rss_".len() + 32);
    assert_eq!(first, second);
}

#[test]
fn test_normalizing_twice_is_identical() {
    let normalizer = Normalizer::new(day(2025, 11, 20));
    let raw = RawRecord::Greenhouse(greenhouse_job());

    let first = normalizer.normalize("greenhouse", &raw).unwrap();
    let second = normalizer.normalize("greenhouse", &raw).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.id, "greenhouse_123");
}

#[test]
fn test_rss_title_at_company_and_author() {
    let normalizer = Normalizer::new(day(2025, 11, 20));

    let at_company = RssEntry {
        title: Some("UI Designer Intern at Globex".to_string()),
        link: Some("https://jobs.example.com/1".to_string()),
        ..Default::default()
    };
    let record = normalizer.normalize("rss", &RawRecord::Rss(at_company)).unwrap();
    assert_eq!(record.company, "Globex");
    assert_eq!(record.title, "UI Designer Intern");

    let authored = RssEntry {
        title: Some("Design Intern".to_string()),
        author: Some("Initech".to_string()),
        link: Some("https://jobs.example.com/2".to_string()),
        ..Default::default()
    };
    let record = normalizer.normalize("rss", &RawRecord::Rss(authored)).unwrap();
    assert_eq!(record.company, "Initech");
    assert_eq!(record.title, "Design Intern");
}

#[test]
fn test_rss_dash_title_and_category_fallbacks() {
    let normalizer = Normalizer::new(day(2025, 11, 20));

    let dashed = RssEntry {
        title: Some("Globex - UX Design Intern".to_string()),
        link: Some("https://jobs.example.com/4".to_string()),
        ..Default::default()
    };
    let record = normalizer.normalize("rss", &RawRecord::Rss(dashed)).unwrap();
    assert_eq!(record.company, "Globex");
    assert_eq!(record.title, "UX Design Intern");

    // A role-like prefix is not taken for a company
    let remote_prefix = RssEntry {
        title: Some("Remote - UX Design Intern".to_string()),
        link: Some("https://jobs.example.com/5".to_string()),
        categories: vec!["Company Jobs".to_string(), "Initech".to_string()],
        ..Default::default()
    };
    let record = normalizer.normalize("rss", &RawRecord::Rss(remote_prefix)).unwrap();
    assert_eq!(record.company, "Initech");
    assert_eq!(record.title, "Remote - UX Design Intern");

    let categorised = RssEntry {
        title: Some("UX Design Intern".to_string()),
        link: Some("https://jobs.example.com/6".to_string()),
        categories: vec!["Initech".to_string()],
        ..Default::default()
    };
    let record = normalizer.normalize("rss", &RawRecord::Rss(categorised)).unwrap();
    assert_eq!(record.company, "Initech");
    assert_eq!(record.title, "UX Design Intern");
}

#[test]
fn test_html_descriptions_keep_escaped_text() {
    assert_eq!(
        to_plain_text("<p>Pay &lt; $30/hr is fine. You will do UX research.</p>"),
        "Pay < $30/hr is fine. You will do UX research."
    );
    assert_eq!(
        to_plain_text("Design&rsquo;s team &mdash; UI&#x2F;UX"),
        "Design\u{2019}s team \u{2014} UI/UX"
    );
    assert_eq!(to_plain_text("<ul><li>Figma</li><li>Sketch</li></ul>"), "Figma Sketch");
    assert_eq!(to_plain_text("<p>Hi</p><script>track()</script>"), "Hi");
    assert_eq!(unescape_markup("&lt;p&gt;A &amp;amp; B&lt;/p&gt;"), "<p>A &amp; B</p>");
}

#[test]
fn test_escaped_description_still_scores() {
    init_tracing();

    let entry = RssEntry {
        title: Some("Acme: Design Intern".to_string()),
        link: Some("https://jobs.example.com/7".to_string()),
        summary: Some("<p>Stipend &lt; $30/hr. You will do UX research.</p>".to_string()),
        ..Default::default()
    };
    let record = Normalizer::new(day(2025, 11, 20))
        .normalize("rss", &RawRecord::Rss(entry))
        .unwrap();
    assert_eq!(
        record.description.as_deref(),
        Some("Stipend < $30/hr. You will do UX research.")
    );

    let filter = RelevanceFilter::new(KeywordConfig::new(vec!["UX research".to_string()], vec![]).unwrap());
    match filter.evaluate(record) {
        FilterOutcome::Accepted(job) => assert_eq!(job.score_breakdown.get("UX research"), Some(1)),
        other => panic!("expected acceptance, got {:?}", other),
    }
}

#[test]
fn test_ashby_record() {
    let job = AshbyJob {
        id: Some("a1b2".to_string()),
        title: Some("Product Design Intern".to_string()),
        location: Some(AshbyLocation::Detailed {
            name: Some("New York".to_string()),
        }),
        job_url: Some("https://jobs.ashbyhq.com/notion/a1b2".to_string()),
        description_html: Some("<p>Design &amp; prototype</p>".to_string()),
        published_at: Some("2025-11-10T09:00:00.000+00:00".to_string()),
        company_name: "Notion".to_string(),
        ..Default::default()
    };

    let record = Normalizer::new(day(2025, 11, 20))
        .normalize("ashby", &RawRecord::Ashby(job))
        .unwrap();

    assert_eq!(record.id, "ashby_a1b2");
    assert_eq!(record.source, JobSource::Ashby);
    assert_eq!(record.company, "Notion");
    assert_eq!(record.location, "New York");
    assert_eq!(record.description.as_deref(), Some("Design & prototype"));
    assert_eq!(record.posted_date, Some(day(2025, 11, 10)));
}

#[test]
fn test_workable_record() {
    let job = WorkableJob {
        shortcode: Some("9F3A2C".to_string()),
        title: Some("UX Design Intern".to_string()),
        city: Some("London".to_string()),
        country: Some("United Kingdom".to_string()),
        published_on: Some("2025-11-12".to_string()),
        url: Some("https://apply.workable.com/revolut/j/9F3A2C/".to_string()),
        company_name: "Revolut".to_string(),
        ..Default::default()
    };
    let remote = WorkableJob {
        shortcode: Some("77".to_string()),
        title: Some("UI Intern".to_string()),
        telecommuting: Some(true),
        url: Some("https://apply.workable.com/revolut/j/77/".to_string()),
        company_name: "Revolut".to_string(),
        ..Default::default()
    };

    let normalizer = Normalizer::new(day(2025, 11, 20));
    let record = normalizer.normalize("workable", &RawRecord::Workable(job)).unwrap();
    assert_eq!(record.id, "workable_9F3A2C");
    assert_eq!(record.location, "London, United Kingdom");
    assert_eq!(record.posted_date, Some(day(2025, 11, 12)));

    let record = normalizer.normalize("workable", &RawRecord::Workable(remote)).unwrap();
    assert_eq!(record.location, "Remote");
    assert_eq!(record.posted_date, None);
}

#[test]
fn test_themuse_record() {
    let job = MuseJob {
        id: Some(1_234_567),
        name: Some("UX Design Intern".to_string()),
        contents: Some("<div>Join our <b>design</b> team</div>".to_string()),
        publication_date: Some("2025-11-15T20:03:10Z".to_string()),
        locations: vec![
            MuseNamed {
                name: Some("Chicago, IL".to_string()),
            },
            MuseNamed {
                name: Some("Flexible / Remote".to_string()),
            },
        ],
        refs: Some(MuseRefs {
            landing_page: Some("https://www.themuse.com/jobs/acme/ux-design-intern".to_string()),
        }),
        company: Some(MuseNamed {
            name: Some("Acme".to_string()),
        }),
    };

    let record = Normalizer::new(day(2025, 11, 20))
        .normalize("themuse", &RawRecord::TheMuse(job))
        .unwrap();

    assert_eq!(record.id, "themuse_1234567");
    assert_eq!(record.source, JobSource::TheMuse);
    assert_eq!(record.company, "Acme");
    assert_eq!(record.location, "Chicago, IL, Flexible / Remote");
    assert_eq!(record.description.as_deref(), Some("Join our design team"));
    assert_eq!(record.posted_date, Some(day(2025, 11, 15)));
}

#[test]
fn test_invalid_records_are_counted_not_fatal() {
    init_tracing();

    let mut untitled = greenhouse_job();
    untitled.title = Some("   ".to_string());

    let mut no_url = greenhouse_job();
    no_url.id = Some(2);
    no_url.absolute_url = None;

    let no_company = RssEntry {
        title: Some("Design Intern".to_string()),
        link: Some("https://jobs.example.com/3".to_string()),
        ..Default::default()
    };

    let batch = vec![
        ("greenhouse".to_string(), RawRecord::Greenhouse(untitled)),
        ("greenhouse".to_string(), RawRecord::Greenhouse(no_url)),
        ("rss".to_string(), RawRecord::Rss(no_company)),
        ("greenhouse".to_string(), RawRecord::Greenhouse(greenhouse_job())),
    ];

    let (records, invalid) = Normalizer::new(day(2025, 11, 20)).normalize_all(&batch);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "greenhouse_123");

    let reasons: Vec<InvalidReason> = invalid.into_iter().map(|i| i.reason).collect();
    assert_eq!(
        reasons,
        vec![
            InvalidReason::MissingTitle,
            InvalidReason::MissingUrl,
            InvalidReason::MissingCompany
        ]
    );
}
