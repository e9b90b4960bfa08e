use scene_audit::{
    analyze, classify_motion, detect_templates, detect_violations, duplicate_clusters,
    environment_distribution, normalize, parse_corpus, scan_lexicon, uniqueness,
    word_count_stats, LexiconMatch, Policy, Scene, ViolationDedup,
};

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

fn motion_scenes(motions: &[&str]) -> Vec<Scene> {
    motions.iter().map(|m| Scene::new(m, "", "", "")).collect()
}

#[test]
fn classification_prefers_specific_phrases() {
    let policy = Policy::default();
    let m = &policy.movements;
    assert_eq!(classify_motion("Slow PAN LEFT across the harbor", m), "pan left");
    assert_eq!(classify_motion("Gentle pan over rooftops", m), "pan");
    assert_eq!(classify_motion("Tilt down to the floor", m), "tilt down");
    assert_eq!(classify_motion("Deliberate freeze on the face", m), "deliberate freeze");
    assert_eq!(classify_motion("Static locked-off shot", m), "static");
}

#[test]
fn classification_is_total() {
    let policy = Policy::default();
    for text in ["", "   ", "the camera floats", "ÜBER 42"] {
        let first = classify_motion(text, &policy.movements);
        assert_eq!(first, "unknown", "input {text:?}");
        assert_eq!(first, classify_motion(text, &policy.movements));
    }
}

#[test]
fn push_in_and_static_rates() {
    let scenes = motion_scenes(&[
        "Static wide shot",
        "Slow push-in toward the desk",
        "Dolly in on the letter",
        "Static close-up, dolly forward implied",
    ]);
    let report = analyze(&scenes, &Policy::default());
    let movement = &report.movement;
    assert_eq!(movement.push_in.count, 3);
    assert_eq!(movement.push_in.rate, Some(0.75));
    assert_eq!(movement.static_shots.count, 2);
    assert_eq!(movement.static_shots.rate, Some(0.5));
    assert_eq!(movement.distribution[0].label, "static");
    assert_eq!(movement.distribution[0].count, 2);
}

#[test]
fn three_statics_is_one_violation() {
    let seq = ["static", "static", "static", "pan", "pan"];
    let violations = detect_violations(&seq, 2, ViolationDedup::Message);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].category, "static");
    assert_eq!(violations[0].streak, 3);
    assert_eq!(violations[0].message, "Scenes 1-3: 'static' x3");
}

#[test]
fn unknown_runs_are_not_violations() {
    let seq = ["unknown", "unknown", "unknown", "", "", "", "tilt"];
    assert!(detect_violations(&seq, 2, ViolationDedup::Message).is_empty());
    assert!(detect_violations(&seq, 2, ViolationDedup::Range).is_empty());
}

#[test]
fn long_run_differs_between_message_and_range_dedup() {
    let seq = ["pan", "static", "static", "static", "static", "static"];
    let by_message = detect_violations(&seq, 2, ViolationDedup::Message);
    let messages: Vec<&str> = by_message.iter().map(|v| v.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Scenes 2-4: 'static' x3",
            "Scenes 2-5: 'static' x4",
            "Scenes 2-6: 'static' x5",
        ]
    );

    // Range mode deliberately reports the maximal run only.
    let by_range = detect_violations(&seq, 2, ViolationDedup::Range);
    assert_eq!(by_range.len(), 1);
    assert_eq!((by_range[0].start_scene, by_range[0].end_scene), (2, 6));
    assert_eq!(by_range[0].streak, 5);
}

#[test]
fn range_mode_closes_runs_mid_sequence() {
    let seq = ["tilt", "tilt", "tilt", "pan", "tilt", "tilt", "tilt", "tilt"];
    let runs = detect_violations(&seq, 2, ViolationDedup::Range);
    let ranges: Vec<(usize, usize)> = runs.iter().map(|v| (v.start_scene, v.end_scene)).collect();
    assert_eq!(ranges, vec![(1, 3), (5, 8)]);
}

#[test]
fn detects_static_locked_single_template() {
    let policy = Policy::default();
    let long = format!("Static locked-off shot, a single candle {}", "x".repeat(120));
    let texts = [
        "Static locked-off shot, a single tree",
        "Slow pan left",
        long.as_str(),
        "Dolly in over the full 7.5 seconds, no pan or tilt",
    ];
    let matches = detect_templates(&texts, &policy.templates, policy.template_preview_chars);
    assert_eq!(matches[0].name, "static-locked-single");
    assert_eq!(matches[0].count, 2);
    assert_eq!(matches[0].previews[0], "Static locked-off shot, a single tree");
    assert_eq!(matches[0].previews[1].chars().count(), 80);
    assert_eq!(matches[1].count, 1);
    assert!(matches[1].previews.is_empty());
}

#[test]
fn normalize_collapses_numbers_and_is_idempotent() {
    assert_eq!(
        normalize("  Dolly 2.5m in 10 Seconds "),
        "dolly #m in # seconds"
    );
    for text in ["Hold 7.5 s", "v1.2.3 build", "#1 shot", "  MIXED case 0042  ", ""] {
        let once = normalize(text);
        assert_eq!(normalize(&once), once, "input {text:?}");
    }
}

#[test]
fn uniqueness_ratio_bounds() {
    let distinct = [
        "Slow dolly forward toward the door",
        "Static wide shot of the empty hall",
        "short",
    ];
    let u = uniqueness(&distinct, 20);
    assert_eq!(u.total, 3);
    assert_eq!(u.considered, 2);
    assert_eq!(u.ratio, Some(1.0));

    let repeated = [
        "Slow dolly forward toward the door, 3 seconds",
        "Slow dolly forward toward the door, 4 seconds",
        "Static wide shot of the empty hall",
        "Static wide shot of the EMPTY hall",
    ];
    let u = uniqueness(&repeated, 20);
    assert_eq!(u.distinct, 2);
    assert_eq!(u.ratio, Some(0.5));

    assert_eq!(uniqueness(&["tiny"], 20).ratio, None);
}

#[test]
fn narration_duplicates_are_clustered() {
    let dups = duplicate_clusters(&["Hello world.", "HELLO WORLD.", "Something else"]);
    assert_eq!(dups.cluster_count, 1);
    assert_eq!(dups.clusters[0].scenes, vec![0, 1]);
    assert_eq!(dups.clusters[0].normalized, "hello world.");

    let numbered = duplicate_clusters(&["Year 1942.", "Year 1945.", "x", "y"]);
    assert_eq!(numbered.cluster_count, 1);
}

#[test]
fn substring_lexicon_counts_fragments() {
    let terms = vec!["fast".to_string(), "zoom".to_string()];
    let texts = ["Breakfast table, static", "FAST whip", "slow pan"];
    let hits = scan_lexicon(&texts, &terms, LexiconMatch::Substring);
    assert!(!hits.none_found);
    assert_eq!(hits.terms.len(), 1);
    assert_eq!(hits.terms[0].term, "fast");
    assert_eq!(hits.terms[0].scenes, 2);
}

#[test]
fn token_lexicon_ignores_fragments() {
    let terms = vec!["fast".to_string(), "concept art".to_string()];
    let texts = ["Breakfast table", "a fast whip", "Concept art, moody", "concept artwork"];
    let hits = scan_lexicon(&texts, &terms, LexiconMatch::Token);
    let counts: Vec<(&str, usize)> = hits
        .terms
        .iter()
        .map(|t| (t.term.as_str(), t.scenes))
        .collect();
    assert_eq!(counts, vec![("fast", 1), ("concept art", 1)]);
}

#[test]
fn lexicon_reports_none_found() {
    let terms = vec!["eerie".to_string()];
    let hits = scan_lexicon(&["bright kitchen"], &terms, LexiconMatch::Substring);
    assert!(hits.none_found);
    assert!(hits.terms.is_empty());
}

#[test]
fn word_count_bands() {
    let (short, ok, long) = (words(30), words(50), words(80));
    let stats = word_count_stats(&[&short, &ok, &long], 35, 70);
    assert_eq!(stats.too_short, 1);
    assert_eq!(stats.in_band, 1);
    assert_eq!(stats.too_long, 1);
    assert_eq!(stats.mean, Some(160.0 / 3.0));

    let edges = [words(35), words(70)];
    let stats = word_count_stats(&[&edges[0], &edges[1]], 35, 70);
    assert_eq!(stats.in_band, 2);
}

#[test]
fn environment_distribution_is_stable() {
    let scenes: Vec<Scene> = ["office", "street", "", "street", "office", "roof"]
        .iter()
        .map(|e| Scene::new("", "", "", e))
        .collect();
    let dist = environment_distribution(&scenes, 15);
    let labels: Vec<(&str, usize)> = dist.iter().map(|c| (c.label.as_str(), c.count)).collect();
    assert_eq!(
        labels,
        vec![("office", 2), ("street", 2), ("unknown", 1), ("roof", 1)]
    );
    assert_eq!(environment_distribution(&scenes, 2).len(), 2);
}

#[test]
fn empty_corpus_yields_sentinels() {
    let report = analyze(&[], &Policy::default());
    assert_eq!(report.scene_count, 0);
    assert_eq!(report.movement.push_in.rate, None);
    assert_eq!(report.movement.static_shots.rate, None);
    assert_eq!(report.motion_uniqueness.ratio, None);
    assert_eq!(report.visual_word_counts.mean, None);
    assert!(report.sequence_violations.is_empty());
    assert!(report.motion_lexicon.none_found);
    assert!(report.visual_lexicon.none_found);
    assert_eq!(report.narration_duplicates.cluster_count, 0);
    assert!(report.environments.is_empty());
    assert!(report.motion_samples.is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["movement"]["push_in"]["rate"].is_null());
}

#[test]
fn report_fields_serialize_in_check_order() {
    let report = analyze(&motion_scenes(&["static"]), &Policy::default());
    let json = serde_json::to_string(&report).unwrap();
    let keys = [
        "\"scene_count\"",
        "\"movement\"",
        "\"motion_uniqueness\"",
        "\"templates\"",
        "\"sequence_violations\"",
        "\"motion_lexicon\"",
        "\"visual_lexicon\"",
        "\"visual_word_counts\"",
        "\"narration_duplicates\"",
        "\"environments\"",
        "\"motion_samples\"",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
}

#[test]
fn analyzes_nested_corpus_document() {
    let mut scenes = Vec::new();
    for i in 0..12 {
        let motion = if i < 4 { "Static locked-off shot, a single lamp" } else { "Slow pan right" };
        scenes.push(serde_json::json!({
            "motionDescription": motion,
            "visualDescription": words(40),
            "narration": format!("Line {i}"),
            "sceneEnvironment": "archive"
        }));
    }
    let doc = serde_json::json!({ "parsed": { "scenes": scenes } });
    let corpus = parse_corpus(&doc.to_string()).unwrap();
    let report = analyze(&corpus, &Policy::default());

    assert_eq!(report.scene_count, 12);
    assert_eq!(report.templates[0].count, 4);
    // static x3, static x4, then pan right x3 .. x8
    assert_eq!(report.sequence_violations.len(), 8);
    assert_eq!(report.sequence_violations[0].message, "Scenes 1-3: 'static' x3");
    assert_eq!(report.visual_word_counts.in_band, 12);
    // "Line N" collapses to "line #" for every scene
    assert_eq!(report.narration_duplicates.cluster_count, 1);
    assert_eq!(report.narration_duplicates.clusters[0].scenes.len(), 12);
    assert_eq!(report.environments[0].label, "archive");
    let sampled: Vec<usize> = report.motion_samples.iter().map(|s| s.index).collect();
    assert_eq!(sampled, vec![0, 10]);
}
