// tof400c.rs — Code emission for the TOF400C (VL53L1X) distance sensor
//
// Turns sensor block operations into sketch fragments on a ProgramAssembly:
// the driver object and bus declarations, one-time setup statements, and
// inline statements or expressions for the loop body.
//
// Preconditions: pin, address and budget arguments are valid C++ expressions.
// Postconditions: shared resources are declared at most once per assembly;
//                 the first declaration's parameters win.
// Failure modes: none at generation time. Sensor start-up failures are
//                encoded into the sketch as a halt loop.
// Side effects: mutates the given ProgramAssembly only.

use std::fmt;

use crate::assembly::ProgramAssembly;
use crate::fragment::Expr;

pub const SENSOR_OBJ: &str = "tof400c";
pub const SENSOR_TYPE: &str = "Adafruit_VL53L1X";
pub const DRIVER_INCLUDE_KEY: &str = "TOF400C_Driver_H";
pub const DRIVER_INCLUDE: &str = "#include \"Adafruit_VL53L1X.h\"";

pub const SOFT_WIRE_OBJ: &str = "tof400cSoftWire";
pub const SOFT_WIRE_TYPE: &str = "SoftWire";
pub const SOFT_WIRE_INCLUDE_KEY: &str = "SoftWire_H";
pub const SOFT_WIRE_INCLUDE: &str = "#include <SoftWire.h>";

pub const HARDWARE_BUS_SETUP_KEY: &str = "wire_begin_tof400c";
pub const SENSOR_BEGIN_KEY: &str = "tof400c_begin";
pub const START_RANGING_KEY: &str = "tof400c_startRanging";

/// Body appended to a failed start-up check: the sketch stops here rather
/// than run against an uninitialized sensor.
const HALT: &str = "{ while (1) delay(10); }";

// ── Bus selection ───────────────────────────────────────────────────────────

/// Which I2C implementation the sensor talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusType {
    Hardware,
    Software,
}

impl BusType {
    pub const SOFTWARE_SELECTOR: i64 = 1;
    pub const HARDWARE_SELECTOR: i64 = 0;

    /// Map a selector code literal onto a bus. Only the software sentinel
    /// selects `Software`; anything else, including unparseable text, falls
    /// back to `Hardware`.
    pub fn from_selector(code: &str) -> BusType {
        match parse_selector(code) {
            Some(Self::SOFTWARE_SELECTOR) => BusType::Software,
            _ => BusType::Hardware,
        }
    }

    /// Strict mapping used when validating option catalogs.
    pub fn from_selector_exact(code: &str) -> Option<BusType> {
        match parse_selector(code)? {
            Self::SOFTWARE_SELECTOR => Some(BusType::Software),
            Self::HARDWARE_SELECTOR => Some(BusType::Hardware),
            _ => None,
        }
    }
}

/// Leading-integer parse in the manner of the editor's `parseInt` without a
/// radix: surrounding whitespace and trailing junk are tolerated, and a
/// `0x`/`0X` prefix reads the digits that follow as hexadecimal.
fn parse_selector(code: &str) -> Option<i64> {
    let s = code.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, rest),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    i64::from_str_radix(&digits[..end], radix)
        .ok()
        .map(|n| sign * n)
}

/// Timing budgets accepted by the VL53L1X driver, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimingBudget {
    Ms20,
    Ms33,
    Ms50,
    Ms100,
    Ms200,
    Ms500,
}

impl TimingBudget {
    pub const ALL: [TimingBudget; 6] = [
        TimingBudget::Ms20,
        TimingBudget::Ms33,
        TimingBudget::Ms50,
        TimingBudget::Ms100,
        TimingBudget::Ms200,
        TimingBudget::Ms500,
    ];

    pub fn millis(self) -> u16 {
        match self {
            TimingBudget::Ms20 => 20,
            TimingBudget::Ms33 => 33,
            TimingBudget::Ms50 => 50,
            TimingBudget::Ms100 => 100,
            TimingBudget::Ms200 => 200,
            TimingBudget::Ms500 => 500,
        }
    }

    pub fn from_millis(ms: u16) -> Option<TimingBudget> {
        Self::ALL.into_iter().find(|b| b.millis() == ms)
    }

    pub fn from_code(code: &str) -> Option<TimingBudget> {
        code.trim().parse::<u16>().ok().and_then(Self::from_millis)
    }
}

impl fmt::Display for TimingBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.millis())
    }
}

// ── Operations ──────────────────────────────────────────────────────────────

/// Declare the driver include and the sensor object. Idempotent: the first
/// call's pins are kept.
pub fn ensure_sensor_declared(asm: &mut ProgramAssembly, xshut_pin: &str, irq_pin: &str) {
    asm.add_include(DRIVER_INCLUDE_KEY, DRIVER_INCLUDE);
    asm.add_object(
        SENSOR_OBJ,
        SENSOR_TYPE,
        &format!("{}({}, {});", SENSOR_OBJ, xshut_pin, irq_pin),
    );
}

/// SDA/SCL pins for the software bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPins<'a> {
    pub sda: &'a str,
    pub scl: &'a str,
}

/// Emit the declarations and setup for `bus` and return the bus-handle
/// expression to pass to the sensor's `begin`.
pub fn select_bus(asm: &mut ProgramAssembly, bus: BusType, pins: BusPins<'_>) -> String {
    match bus {
        BusType::Software => {
            asm.add_include(SOFT_WIRE_INCLUDE_KEY, SOFT_WIRE_INCLUDE);
            asm.add_object(
                SOFT_WIRE_OBJ,
                SOFT_WIRE_TYPE,
                &format!("{}({}, {});", SOFT_WIRE_OBJ, pins.sda, pins.scl),
            );
            asm.add_setup(
                &format!("{}_begin", SOFT_WIRE_OBJ),
                &format!("{}.begin();", SOFT_WIRE_OBJ),
                false,
            );
            format!("&{}", SOFT_WIRE_OBJ)
        }
        BusType::Hardware => {
            asm.add_setup(HARDWARE_BUS_SETUP_KEY, "Wire.begin();", false);
            "&Wire".to_string()
        }
    }
}

/// Register the critical sensor start-up statement.
pub fn begin_sensor(asm: &mut ProgramAssembly, address: &str, bus_handle: &str) {
    asm.add_setup(
        SENSOR_BEGIN_KEY,
        &format!(
            "if (!{}.begin({}, {})) {}",
            SENSOR_OBJ, address, bus_handle, HALT
        ),
        true,
    );
}

/// Parameters of the `init` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitParams<'a> {
    pub xshut_pin: &'a str,
    pub irq_pin: &'a str,
    /// Bus selector code literal, e.g. `"0"` or `"1"`.
    pub selector: &'a str,
    pub address: &'a str,
    pub pins: BusPins<'a>,
}

/// Full sensor initialization: bus, sensor object, and start-up check.
pub fn init(asm: &mut ProgramAssembly, params: &InitParams<'_>) {
    let bus = BusType::from_selector(params.selector);
    tracing::debug!(?bus, selector = params.selector, "tof400c init");
    let handle = select_bus(asm, bus, params.pins);
    ensure_sensor_declared(asm, params.xshut_pin, params.irq_pin);
    begin_sensor(asm, params.address, &handle);
}

/// Inline statement; each call site gets its own copy.
pub fn set_timing_budget(asm: &mut ProgramAssembly, budget: &str) {
    asm.add_code(format!("{}.setTimingBudget({});", SENSOR_OBJ, budget));
}

pub fn start_ranging(asm: &mut ProgramAssembly) {
    asm.add_setup(
        START_RANGING_KEY,
        &format!("if (!{}.startRanging()) {}", SENSOR_OBJ, HALT),
        true,
    );
}

pub fn clear_interrupt_flag(asm: &mut ProgramAssembly) {
    asm.add_code(format!("{}.clearInterrupt();", SENSOR_OBJ));
}

fn query_expr(method: &str) -> Expr {
    Expr::atomic(format!("{}.{}()", SENSOR_OBJ, method))
}

pub fn data_ready_expr() -> Expr {
    query_expr("dataReady")
}

/// Distance in millimetres.
pub fn distance_expr() -> Expr {
    query_expr("distance")
}

pub fn sensor_id_expr() -> Expr {
    query_expr("sensorID")
}

// Queries placed directly in the program are kept in the inline stream.
fn query(asm: &mut ProgramAssembly, expr: Expr) -> Expr {
    asm.add_expr(expr.clone());
    expr
}

pub fn is_data_ready(asm: &mut ProgramAssembly) -> Expr {
    query(asm, data_ready_expr())
}

pub fn get_distance(asm: &mut ProgramAssembly) -> Expr {
    query(asm, distance_expr())
}

pub fn get_sensor_id(asm: &mut ProgramAssembly) -> Expr {
    query(asm, sensor_id_expr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, Order};

    fn init_params(selector: &str) -> InitParams<'_> {
        InitParams {
            xshut_pin: "3",
            irq_pin: "2",
            selector,
            address: "0x29",
            pins: BusPins {
                sda: "A4",
                scl: "A5",
            },
        }
    }

    fn setup_codes(asm: &ProgramAssembly) -> Vec<&str> {
        asm.setup().iter().map(|s| s.code.as_str()).collect()
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(BusType::from_selector("1"), BusType::Software);
        assert_eq!(BusType::from_selector(" 1 "), BusType::Software);
        assert_eq!(BusType::from_selector("1abc"), BusType::Software);
        assert_eq!(BusType::from_selector("0"), BusType::Hardware);
        assert_eq!(BusType::from_selector("2"), BusType::Hardware);
        assert_eq!(BusType::from_selector("-1"), BusType::Hardware);
        assert_eq!(BusType::from_selector(""), BusType::Hardware);
        assert_eq!(BusType::from_selector("Software"), BusType::Hardware);
    }

    #[test]
    fn hex_selector_parsing() {
        assert_eq!(BusType::from_selector("0x1"), BusType::Software);
        assert_eq!(BusType::from_selector("0X1"), BusType::Software);
        assert_eq!(BusType::from_selector("+0x1g"), BusType::Software);
        assert_eq!(BusType::from_selector("0x01"), BusType::Software);
        assert_eq!(BusType::from_selector("0x0"), BusType::Hardware);
        assert_eq!(BusType::from_selector("0x"), BusType::Hardware);
        assert_eq!(BusType::from_selector("0x10"), BusType::Hardware);
        assert_eq!(BusType::from_selector("-0x1"), BusType::Hardware);
    }

    #[test]
    fn exact_selector_mapping() {
        assert_eq!(BusType::from_selector_exact("0"), Some(BusType::Hardware));
        assert_eq!(BusType::from_selector_exact("1"), Some(BusType::Software));
        assert_eq!(BusType::from_selector_exact("2"), None);
        assert_eq!(BusType::from_selector_exact("x"), None);
        assert_eq!(BusType::from_selector_exact("0x1"), Some(BusType::Software));
        assert_eq!(BusType::from_selector_exact("0x0"), Some(BusType::Hardware));
        assert_eq!(BusType::from_selector_exact("0x"), None);
    }

    #[test]
    fn timing_budget_codes() {
        assert_eq!(TimingBudget::from_code("50"), Some(TimingBudget::Ms50));
        assert_eq!(TimingBudget::from_code("33"), Some(TimingBudget::Ms33));
        assert_eq!(TimingBudget::from_code("40"), None);
        assert_eq!(TimingBudget::from_code("fast"), None);
        assert_eq!(TimingBudget::Ms500.to_string(), "500");
    }

    #[test]
    fn sensor_declared_once_with_first_pins() {
        let mut asm = ProgramAssembly::new();
        ensure_sensor_declared(&mut asm, "3", "2");
        ensure_sensor_declared(&mut asm, "7", "8");
        assert_eq!(asm.includes().len(), 1);
        assert_eq!(asm.objects().len(), 1);
        assert_eq!(asm.objects()[0].text(), "Adafruit_VL53L1X tof400c(3, 2);");
    }

    #[test]
    fn hardware_bus_init() {
        let mut asm = ProgramAssembly::new();
        init(&mut asm, &init_params("0"));
        assert_eq!(
            setup_codes(&asm),
            [
                "Wire.begin();",
                "if (!tof400c.begin(0x29, &Wire)) { while (1) delay(10); }",
            ]
        );
        assert!(asm.object(SOFT_WIRE_OBJ).is_none());
        assert_eq!(asm.includes().len(), 1);
    }

    #[test]
    fn software_bus_init() {
        let mut asm = ProgramAssembly::new();
        init(&mut asm, &init_params("1"));
        assert_eq!(
            asm.object(SOFT_WIRE_OBJ).map(|o| o.text()),
            Some("SoftWire tof400cSoftWire(A4, A5);".to_string())
        );
        assert_eq!(
            setup_codes(&asm),
            [
                "tof400cSoftWire.begin();",
                "if (!tof400c.begin(0x29, &tof400cSoftWire)) { while (1) delay(10); }",
            ]
        );
        assert!(asm.setup_statement(HARDWARE_BUS_SETUP_KEY).is_none());
    }

    #[test]
    fn critical_flags() {
        let mut asm = ProgramAssembly::new();
        init(&mut asm, &init_params("1"));
        start_ranging(&mut asm);
        let flags: Vec<(&str, bool)> = asm
            .setup()
            .iter()
            .map(|s| (s.key.as_str(), s.critical))
            .collect();
        assert_eq!(
            flags,
            [
                ("tof400cSoftWire_begin", false),
                ("tof400c_begin", true),
                ("tof400c_startRanging", true),
            ]
        );
    }

    #[test]
    fn start_ranging_is_idempotent() {
        let mut asm = ProgramAssembly::new();
        start_ranging(&mut asm);
        start_ranging(&mut asm);
        assert_eq!(asm.setup().len(), 1);
        assert!(asm.diagnostics().is_empty());
    }

    #[test]
    fn inline_commands_are_not_deduplicated() {
        let mut asm = ProgramAssembly::new();
        set_timing_budget(&mut asm, "20");
        set_timing_budget(&mut asm, "100");
        clear_interrupt_flag(&mut asm);
        clear_interrupt_flag(&mut asm);
        let codes: Vec<&str> = asm.code().iter().map(|f| f.code()).collect();
        assert_eq!(
            codes,
            [
                "tof400c.setTimingBudget(20);",
                "tof400c.setTimingBudget(100);",
                "tof400c.clearInterrupt();",
                "tof400c.clearInterrupt();",
            ]
        );
    }

    #[test]
    fn queries_are_atomic_expressions() {
        let mut asm = ProgramAssembly::new();
        let ready = is_data_ready(&mut asm);
        let dist = get_distance(&mut asm);
        let id = get_sensor_id(&mut asm);
        assert_eq!(ready, Expr::atomic("tof400c.dataReady()"));
        assert_eq!(dist.code, "tof400c.distance()");
        assert_eq!(id.code, "tof400c.sensorID()");
        assert!(asm
            .code()
            .iter()
            .all(|f| matches!(f, Fragment::Expression { expr } if expr.order == Order::Atomic)));
        assert!(asm.setup().is_empty());
    }
}
