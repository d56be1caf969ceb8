//! Fields computed from the merged payload rather than read from registers.

use super::decoder::Payload;

const TYPE_250_KS: i64 = 251;

/// The 250 KS reports itself as type 251.
pub fn device_type(payload: &mut Payload) {
    if payload.int("Type") == Some(TYPE_250_KS) {
        payload.insert("Type", "250 KS");
    }
}

pub fn charge_stage_icon(stage: i64) -> &'static str {
    match stage {
        3 | 4 => "mdi:battery-charging",
        5 | 6 => "mdi:format-float-center",
        7.. => "mdi:approximately-equal",
        _ => "mdi:music-rest-whole",
    }
}

pub fn charge_state_icon(payload: &mut Payload) {
    if let Some(stage) = payload.int("ChargeStage") {
        payload.insert("ChargeStateIcon", charge_stage_icon(stage));
    }
}

/// Battery icon in steps of ten percent, with the charging variant while in
/// absorb or bulk.
pub fn soc_icon_name(stage: i64, soc: i64) -> String {
    let charging = if matches!(stage, 3 | 4) { "charging-" } else { "" };

    match (charging, soc.clamp(0, 100) / 10) {
        ("", 10) => "mdi:battery".to_owned(),
        (charging, tens) => format!("mdi:battery-{charging}{tens}0"),
    }
}

pub fn soc_icon(payload: &mut Payload) {
    if let (Some(stage), Some(soc)) = (payload.int("ChargeStage"), payload.int("SOC")) {
        payload.insert("SOCicon", soc_icon_name(stage, soc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classic::{
        decoder::{decode_device, tests::classic_image},
        schema::CLASSIC,
        tables::CHARGE_STAGE,
    };

    fn icon_for_text(text: &str) -> &'static str {
        match text {
            "Resting" => "mdi:music-rest-whole",
            "Absorb" | "Bulk MPPT" => "mdi:battery-charging",
            "Float" | "Float MPPT" => "mdi:format-float-center",
            "Equalize" | "HyperVOC" | "Equalize MPPT" => "mdi:approximately-equal",
            other => panic!("no icon expected for {other}"),
        }
    }

    #[test]
    fn charge_icon_follows_the_stage_text() {
        for code in CHARGE_STAGE.codes() {
            let mut image = classic_image();
            image[0].words[19] = (code << 8) | 3;

            let payload = decode_device(&CLASSIC, &image).unwrap();
            let text = payload.text("ChargeStateText").unwrap();

            assert_eq!(payload.text("ChargeStateIcon"), Some(icon_for_text(text)), "stage {code}");
        }
    }

    #[test]
    fn soc_icon_steps() {
        assert_eq!(soc_icon_name(0, 100), "mdi:battery");
        assert_eq!(soc_icon_name(4, 100), "mdi:battery-charging-100");
        assert_eq!(soc_icon_name(5, 87), "mdi:battery-80");
        assert_eq!(soc_icon_name(3, 42), "mdi:battery-charging-40");
        assert_eq!(soc_icon_name(0, 5), "mdi:battery-00");
        assert_eq!(soc_icon_name(0, 250), "mdi:battery");
    }

    #[test]
    fn type_251_is_renamed() {
        let mut payload = Payload::new();
        payload.insert("Type", 251_i64);
        device_type(&mut payload);
        assert_eq!(payload.text("Type"), Some("250 KS"));

        let mut payload = Payload::new();
        payload.insert("Type", 150_i64);
        device_type(&mut payload);
        assert_eq!(payload.int("Type"), Some(150));
    }

    #[test]
    fn derivations_skip_missing_sources() {
        let mut payload = Payload::new();
        charge_state_icon(&mut payload);
        soc_icon(&mut payload);

        assert!(payload.is_empty());
    }
}
