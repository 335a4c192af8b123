//! Serde shapes of the public records

use tickscope::types::*;

#[test]
fn test_bias_serialization() {
    assert_eq!(serde_json::to_string(&Bias::Bullish).unwrap(), "\"BULLISH\"");
    let parsed: Bias = serde_json::from_str("\"BEARISH\"").unwrap();
    assert_eq!(parsed, Bias::Bearish);
    assert_eq!(Bias::from_score(-0.1), Bias::Bearish);
    assert_eq!(Bias::from_score(0.0), Bias::Neutral);
    assert_eq!(Bias::Bullish.opposite(), Bias::Bearish);
}

#[test]
fn test_enum_labels() {
    assert_eq!(serde_json::to_string(&KillZone::NewYork).unwrap(), "\"NEW_YORK\"");
    assert_eq!(serde_json::to_string(&InstitutionalFlow::StrongBuy).unwrap(), "\"STRONG_BUY\"");
    assert_eq!(serde_json::to_string(&MarketStructure::HigherHighs).unwrap(), "\"HH/HL\"");
    assert_eq!(serde_json::to_string(&LiquiditySide::SellSide).unwrap(), "\"SELL_SIDE\"");
    assert_eq!(serde_json::to_string(&SpikeSeverity::Extreme).unwrap(), "\"EXTREME\"");
    assert_eq!(serde_json::to_string(&TradeDirection::Sell).unwrap(), "\"SELL\"");
    assert_eq!(serde_json::to_string(&Timeframe::M15).unwrap(), "\"M15\"");
}

#[test]
fn test_kill_zone_hours() {
    assert_eq!(KillZone::from_utc_hour(7), (KillZone::London, 95));
    assert_eq!(KillZone::from_utc_hour(10), (KillZone::London, 95));
    assert_eq!(KillZone::from_utc_hour(11), (KillZone::None, 0));
    assert_eq!(KillZone::from_utc_hour(15), (KillZone::NewYork, 98));
    assert_eq!(KillZone::from_utc_hour(1), (KillZone::Asia, 85));
    assert_eq!(KillZone::from_utc_hour(0), (KillZone::None, 0));
}

#[test]
fn test_spike_severity_bands() {
    assert_eq!(SpikeSeverity::from_probability(95.0), SpikeSeverity::Extreme);
    assert_eq!(SpikeSeverity::from_probability(80.0), SpikeSeverity::Critical);
    assert_eq!(SpikeSeverity::from_probability(60.0), SpikeSeverity::High);
    assert_eq!(SpikeSeverity::from_probability(40.0), SpikeSeverity::Medium);
    assert_eq!(SpikeSeverity::from_probability(35.0), SpikeSeverity::Low);
}

#[test]
fn test_timeframe_slices() {
    let history: Vec<f64> = (0..100).map(|i| i as f64).collect();
    assert_eq!(Timeframe::M5.slice(&history).len(), 30);
    assert_eq!(Timeframe::M15.slice(&history).len(), 60);
    assert_eq!(Timeframe::H1.slice(&history).len(), 100);
    assert_eq!(Timeframe::H4.slice(&history).len(), 100);
    assert_eq!(Timeframe::M5.slice(&history)[0], 70.0);
    assert_eq!(Timeframe::from_str("4h"), Some(Timeframe::H4));
}

#[test]
fn test_record_field_names() {
    let zone = LiquidityZone {
        side: LiquiditySide::BuySide,
        price: 1.0,
        strength: 2.0,
        touches: 3,
        swept: true,
    };
    let json = serde_json::to_value(zone).unwrap();
    assert_eq!(json["type"], "BUY_SIDE");
    assert_eq!(json["touches"], 3);

    let spike = serde_json::to_value(SpikeResult::placeholder()).unwrap();
    assert_eq!(spike["isSpike"], false);
    assert!(spike.get("timeToSpike").is_none());

    let ict = serde_json::to_value(IctResult::placeholder(KillZone::Asia, 85)).unwrap();
    assert_eq!(ict["killZone"], "ASIA");
    assert_eq!(ict["optimalEntry"], "WAITING");
    assert_eq!(ict["powerOfThree"]["phase"], "UNDEFINED");
}

#[test]
fn test_connection_state_shape() {
    let json = serde_json::to_value(ConnectionState::Reconnecting {
        attempt: 2,
        delay_ms: 2000,
    })
    .unwrap();
    assert_eq!(json["state"], "reconnecting");
    assert_eq!(json["attempt"], 2);
    assert_eq!(ConnectionState::Live.to_string(), "live");
}
