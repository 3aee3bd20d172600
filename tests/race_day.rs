//! End-to-end: card -> wagers -> simulated races -> settlement

use raceday::core::seed_from_str;
use raceday::data::parse_race_card;
use raceday::models::Category;
use raceday::{
    BetType, BettingLedger, EngineConfig, LegSelection, RaceResult, RaceSimulator, RaceStatus,
    SharedLedger, SyntheticMarket, WagerId, WagerStatus,
};

const CARD: &str = r#"{
    "meeting": "Caulfield",
    "races": [
        {
            "race_id": "CAU-R1",
            "race_number": 1,
            "category": "horse",
            "advertised_start_ms": 600000,
            "weather": { "kind": "rain", "intensity": 0.4 },
            "track": { "kind": "soft" },
            "competitors": [
                { "id": "h1", "name": "Apex", "number": 1, "odds": 2.2 },
                { "id": "h2", "name": "Bolt", "number": 2, "odds": 4.5 },
                { "id": "h3", "name": "Cinder", "number": 3, "odds": 6.0 },
                { "id": "h4", "name": "Drift", "number": 4, "odds": 9.0 },
                { "id": "h5", "name": "Ember", "number": 5, "odds": null }
            ]
        },
        {
            "race_id": "CAU-R2",
            "race_number": 2,
            "category": "greyhound",
            "advertised_start_ms": 1200000,
            "competitors": [
                { "id": "g1", "name": "Flash", "number": 1, "odds": 3.0 },
                { "id": "g2", "name": "Gust", "number": 2, "odds": 3.5 },
                { "id": "g3", "name": "Hustle", "number": 3, "odds": 5.0 },
                { "id": "g4", "name": "Inky", "number": 4, "odds": 8.0 }
            ]
        }
    ]
}"#;

fn run(config: &EngineConfig, spec: &raceday::RaceSpec) -> RaceResult {
    let mut sim =
        RaceSimulator::from_config(spec.clone(), seed_from_str(&spec.race_id), config).unwrap();
    let (result, ticks) = sim.run_to_completion(spec.advertised_start_ms).unwrap();
    assert!(ticks > 1);
    result
}

#[test]
fn test_card_to_settlement() {
    let config = EngineConfig::default();
    let card = parse_race_card(CARD).unwrap();
    let r1 = card.race("CAU-R1").unwrap();
    let r2 = card.race("CAU-R2").unwrap();
    let (q1, q2) = (r1.quote(), r2.quote());

    let mut ledger = BettingLedger::new(&config);
    let win = ledger.place_single(&q1, "h1", 100.0, BetType::Win).unwrap();
    let each_way = ledger.place_single(&q1, "h5", 50.0, BetType::EachWay).unwrap();
    let place = ledger.place_single(&q2, "g2", 40.0, BetType::Place).unwrap();
    let multi = ledger
        .place_multi(
            &[LegSelection::new(&q1, "h2"), LegSelection::new(&q2, "g1")],
            10.0,
        )
        .unwrap();

    let bank = ledger.bankroll();
    assert!((bank.locked - 200.0).abs() < 1e-9);
    assert!((bank.available - 800.0).abs() < 1e-9);

    // Unpriced runner falls back to starting price
    assert!((each_way.legs[0].win_odds - 10.0).abs() < 1e-12);

    let res1 = run(&config, r1);
    let res2 = run(&config, r2);
    assert_eq!(res1.status, RaceStatus::Finished);
    assert_eq!(res1.placings.len(), 5);
    assert_eq!(res2.placings.len(), 4);

    // Same seed, same race
    assert_eq!(run(&config, r1), res1);

    let records = ledger.settle_many(&[res2.clone(), res1.clone()]);
    assert!(ledger.open_wagers().is_empty());
    assert_eq!(records.len(), 4);

    let status_of = |id: WagerId| {
        records
            .iter()
            .find(|r| r.wager_id == id)
            .map(|r| r.status)
            .unwrap()
    };
    let expected_win = if res1.winner() == Some("h1") {
        WagerStatus::Won
    } else {
        WagerStatus::Lost
    };
    assert_eq!(status_of(win.id), expected_win);

    // Greyhound field of four pays a single place
    let expected_place = if res2.position_of("g2") == Some(1) {
        WagerStatus::Won
    } else {
        WagerStatus::Lost
    };
    assert_eq!(status_of(place.id), expected_place);

    let expected_multi = if res1.winner() == Some("h2") && res2.winner() == Some("g1") {
        WagerStatus::Won
    } else {
        WagerStatus::Lost
    };
    assert_eq!(status_of(multi.id), expected_multi);
    assert_ne!(status_of(each_way.id), WagerStatus::Pending);

    let bank = ledger.bankroll();
    let pnl: f64 = records.iter().map(|r| r.profit_loss).sum();
    assert_eq!(bank.locked, 0.0);
    assert!((bank.total() - (1_000.0 + pnl)).abs() < 1e-9);
    assert!((bank.turnover - 200.0).abs() < 1e-9);

    // Both races are closed now
    assert!(ledger.settle_race(&res1).is_empty());
    assert!(ledger.settle_race(&res2).is_empty());
}

#[test]
fn test_synthetic_meeting_on_shared_ledger() {
    let config = EngineConfig::default();
    let card = SyntheticMarket::default().generate_card(
        "Flemington",
        Category::horse(),
        3,
        10,
        0,
        77,
    );
    let ledger = SharedLedger::new(BettingLedger::new(&config));

    for race in &card.races {
        let quote = race.quote();
        for competitor in &race.competitors {
            ledger
                .place_single(&quote, &competitor.id, 5.0, BetType::EachWay)
                .unwrap();
        }
    }
    assert_eq!(ledger.open_wagers().len(), 30);

    let results: Vec<RaceResult> = card.races.iter().map(|r| run(&config, r)).collect();
    let records = ledger.settle_many(&results);
    assert_eq!(records.len(), 30);

    // Ten runners pay three places: one full win, two partials per race
    let won = records.iter().filter(|r| r.status == WagerStatus::Won).count();
    let partial = records
        .iter()
        .filter(|r| r.status == WagerStatus::SettledPartial)
        .count();
    assert_eq!(won, 3);
    assert_eq!(partial, 6);
    assert_eq!(ledger.bankroll().locked, 0.0);
}
