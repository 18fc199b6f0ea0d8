use super::*;

use mapscout_core::ExtractionDepth;

#[test]
fn parses_search_with_defaults() {
    let cli = Cli::try_parse_from(["mapscout-cli", "search", "coffee in Lisbon"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Search {
            query,
            max_places,
            lang,
            headed,
            details,
        } => {
            assert_eq!(query, "coffee in Lisbon");
            assert_eq!(max_places, 20);
            assert_eq!(lang, "en");
            assert!(!headed);
            assert!(!details);
        }
        other @ Commands::Extract { .. } => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_search_flags() {
    let cli = Cli::try_parse_from([
        "mapscout-cli",
        "search",
        "bakery",
        "--max-places",
        "5",
        "--lang",
        "pt-BR",
        "--headed",
        "--details",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Search {
            max_places: 5,
            headed: true,
            details: true,
            ..
        }
    ));
}

#[test]
fn parses_extract_command() {
    let cli = Cli::try_parse_from([
        "mapscout-cli",
        "extract",
        "page.html",
        "--link",
        "https://www.google.com/maps/place/cafe",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Extract { file, link, details } => {
            assert_eq!(file, PathBuf::from("page.html"));
            assert_eq!(link.as_deref(), Some("https://www.google.com/maps/place/cafe"));
            assert!(!details);
        }
        other @ Commands::Search { .. } => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["mapscout-cli"]).is_err());
}

#[test]
fn search_args_reject_out_of_range_max_places() {
    let args = search::SearchArgs {
        query: "cafe".to_string(),
        max_places: 0,
        lang: "en".to_string(),
        headless: true,
        details: false,
    };
    assert!(args.to_request().is_err());
}

#[test]
fn search_args_map_details_to_full_depth() {
    let args = search::SearchArgs {
        query: "cafe".to_string(),
        max_places: 10,
        lang: "en".to_string(),
        headless: false,
        details: true,
    };
    let request = args.to_request().unwrap();
    assert_eq!(request.depth(), ExtractionDepth::Full);
    assert!(!request.headless());
}

#[test]
fn saved_page_with_title_yields_one_record() {
    let markup = "<html><head><title>Example Cafe - Google Maps</title></head></html>";
    let records = extract::extract_records(markup, "page.html", ExtractionDepth::Summary);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Example Cafe");
    assert_eq!(records[0].link, "page.html");
}

#[test]
fn saved_page_without_name_yields_nothing() {
    let records = extract::extract_records("<html><body></body></html>", "page.html", ExtractionDepth::Full);
    assert!(records.is_empty());
}

#[test]
fn control_label_outside_heading_is_not_a_name() {
    let markup = r#"<title>Google Maps</title><h1 class="x"></h1><div><button><span>Directions</span></button></div>"#;
    let records = extract::extract_records(markup, "page.html", ExtractionDepth::Full);
    assert!(records.is_empty());
}
