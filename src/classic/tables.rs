use log::warn;

/// Code to display-text lookup for one enumerated register.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    entries: &'static [(u16, &'static str)],
}

impl Table {
    pub const fn new(name: &'static str, entries: &'static [(u16, &'static str)]) -> Self {
        Self { name, entries }
    }

    pub fn get(&self, code: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|&&(entry, _)| i64::from(entry) == code)
            .map(|&(_, text)| text)
    }

    /// Never fails: codes missing from the table come back as `Unknown code: N`.
    pub fn text(&self, code: i64) -> String {
        match self.get(code) {
            Some(text) => text.to_owned(),
            None => {
                warn!("{} has no text for code {code}", self.name);
                format!("Unknown code: {code}")
            },
        }
    }

    #[cfg(test)]
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|&(code, _)| code)
    }
}

pub static CHARGE_STAGE: Table = Table::new(
    "ChargeStage",
    &[
        (0, "Resting"),
        (3, "Absorb"),
        (4, "Bulk MPPT"),
        (5, "Float"),
        (6, "Float MPPT"),
        (7, "Equalize"),
        (10, "HyperVOC"),
        (18, "Equalize MPPT"),
    ],
);

pub static MPPT_MODE: Table = Table::new(
    "MPPTMode",
    &[
        (1, "PV_Uset"),
        (3, "DYNAMIC"),
        (5, "WIND TRACK"),
        (7, "RESERVED"),
        (9, "Legacy P&O"),
        (11, "SOLAR"),
        (13, "HYDRO"),
        (15, "RESERVED"),
    ],
);

pub static AUX_STATE: Table = Table::new(
    "AuxOffAutoOn",
    &[(0, "AUX Off"), (1, "AUX Auto"), (2, "AUX On"), (3, "Unimplemented")],
);

pub static AUX1_FUNCTION: Table = Table::new(
    "Aux1Function",
    &[
        (1, "DIVERSION SLOW HIGH"),
        (2, "Low Battery Disconnect High"),
        (3, "WASTE NOT HIGH"),
        (4, "RESERVED"),
        (5, "RESERVED"),
        (6, "TOGGLE TEST"),
        (7, "PV V ON HIGH"),
        (8, "PV V ON LOW"),
        (9, "RESERVED"),
        (10, "RESERVED"),
        (11, "RESERVED"),
        (12, "RESERVED"),
        (13, "TOGGLE TEST"),
        (14, "NIGHT LIGHT HIGH"),
        (15, "DAY LIGHT HIGH"),
        (16, "WIND CLIPPER CONTROL"),
        (17, "FLOAT HIGH"),
        (18, "FLOAT LOW"),
        (19, "VENT FAN HIGH"),
        (20, "VENT FAN LOW"),
        (21, "GFP TRIP HIGH"),
        (22, "SOC% HIGH"),
        (23, "SOC% LOW"),
    ],
);

pub static AUX2_FUNCTION: Table = Table::new(
    "Aux2Function",
    &[
        (0, "DIVERSION HIGH PWM"),
        (1, "DIVERSION LOW PWM"),
        (2, "WASTE NOT HIGH"),
        (3, "WASTE NOT LOW"),
        (4, "RESERVED"),
        (5, "RESERVED"),
        (6, "TOGGLE TEST"),
        (7, "PV V ON HIGH"),
        (8, "PV V ON LOW"),
        (9, "RESERVED"),
        (10, "WIND CLIPPER CONTROL"),
        (11, "NIGHT LIGHT HIGH"),
        (12, "DAY LIGHT HIGH"),
        (13, "FLOAT HIGH OUTPUT"),
        (14, "FLOAT LOW OUTPUT"),
        (15, "Active HIGH (input) turn off"),
        (16, "Active LOW (input) turn off"),
        (17, "Active HIGH (input) Float"),
        (18, "Whizbang Junior (WB Jr.)"),
    ],
);

pub static REST_REASON: Table = Table::new(
    "ReasonForResting",
    &[
        (1, "Anti-Click. Not enough power available (Wake Up)"),
        (2, "Insane Ibatt Measurement (Wake Up)"),
        (3, "Negative Current (load on PV input ?) (Wake Up)"),
        (4, "PV Input Voltage lower than Battery V (Vreg state)"),
        (5, "Too low of power out and Vbatt below set point for > 90 seconds"),
        (6, "FET temperature too high (Cover is on maybe?)"),
        (7, "Ground Fault Detected"),
        (8, "Arc Fault Detected"),
        (9, "Too much negative current while operating (backfeed from battery out of PV input)"),
        (10, "Battery is less than 8.0 Volts"),
        (11, "PV input is available but V is rising too slowly. Low Light or bad connection(Solar mode)"),
        (12, "Voc has gone down from last Voc or low light. Re-check (Solar mode)"),
        (13, "Voc has gone up from last Voc enough to be suspicious. Re-check (Solar mode)"),
        (14, "PV input is available but V is rising too slowly. Low Light or bad connection(Solar mode)"),
        (15, "Voc has gone down from last Voc or low light. Re-check (Solar mode)"),
        (16, "Mppt MODE is OFF (Usually because user turned it off)"),
        (17, "PV input is higher than operation range (too high for 150V Classic)"),
        (18, "PV input is higher than operation range (too high for 200V Classic)"),
        (19, "PV input is higher than operation range (too high for 250V or 250KS)"),
        (22, "Average Battery Voltage is too high above set point"),
        (25, "Battery Voltage too high of Overshoot (small battery or bad cable ?)"),
        (
            26,
            "Mode changed while running OR Vabsorb raised more than 10.0 Volts at once OR Nominal Vbatt changed by \
             modbus command AND MpptMode was ON when changed",
        ),
        (27, "bridge center == 1023 (R132 might have been stuffed) This turns MPPT Mode to OFF"),
        (28, "NOT Resting but RELAY is not engaged for some reason"),
        (29, "ON/OFF stays off because WIND GRAPH is illegal (current step is set for > 100 amps)"),
        (30, "PkAmpsOverLimit... Software detected too high of PEAK output current"),
        (31, "AD1CH.IbattMinus > 900 Peak negative battery current > 90.0 amps (Classic 250)"),
        (32, "Aux 2 input commanded Classic off. for HI or LO (Aux2Function == 15 or 16)"),
        (33, "OCP in a mode other than Solar or PV-Uset"),
        (34, "AD1CH.IbattMinus > 900 Peak negative battery current > 90.0 amps (Classic 150, 200)"),
        (
            35,
            "Battery voltage is less than Low Battery Disconnect (LBD) Typically Vbatt is less than 8.5 volts",
        ),
        (104, "104?=14?: PV input is available but V is rising too slowly. Low Light or bad connection(Solar mode)"),
        (111, "Normal Power up boot."),
    ],
);
