// blocks.rs — Block catalog and dispatch
//
// Describes the sensor blocks offered by the editor (opcode, shape, inputs
// with their default values and option sets) and routes an invocation to the
// matching emission operation in `tof400c`. Every input of these blocks lands
// in a call argument, so parameters are spliced at `Order::Comma`.

use std::borrow::Cow;

use crate::assembly::ProgramAssembly;
use crate::block::{BlockError, BlockInvocation};
use crate::fragment::{Expr, Order};
use crate::tof400c::{self, BusPins, InitParams};

pub const BUS_OPTION_SET: &str = "MY_TOF_I2C_TYPES";
pub const BUDGET_OPTION_SET: &str = "MY_TOF_TIMING_BUDGETS";

const ARG: Order = Order::Comma;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Init,
    SetTimingBudget,
    StartRanging,
    IsDataReady,
    GetDistance,
    ClearInterruptFlag,
    GetSensorId,
}

/// Visual shape of a block, which also decides what it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// Statement block; emits into setup or the loop body.
    Command,
    /// Boolean reporter; yields an expression.
    Boolean,
    /// Value reporter; yields an expression.
    Reporter,
}

/// One block input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Code literal the editor fills in when the user leaves the input alone.
    pub default: &'static str,
    /// Option set backing a dropdown input, if any.
    pub options: Option<&'static str>,
}

const fn param(name: &'static str, default: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        default,
        options: None,
    }
}

const INIT_PARAMS: &[ParamSpec] = &[
    param("XPIN", "3"),
    param("IPIN", "2"),
    ParamSpec {
        name: "I2C_SEL",
        default: "0",
        options: Some(BUS_OPTION_SET),
    },
    param("ADDR", "0x29"),
    param("SDA_PIN", "A4"),
    param("SCL_PIN", "A5"),
];

const BUDGET_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "BUDGET",
    default: "50",
    options: Some(BUDGET_OPTION_SET),
}];

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Init,
        BlockKind::SetTimingBudget,
        BlockKind::StartRanging,
        BlockKind::IsDataReady,
        BlockKind::GetDistance,
        BlockKind::ClearInterruptFlag,
        BlockKind::GetSensorId,
    ];

    pub fn opcode(self) -> &'static str {
        match self {
            BlockKind::Init => "init",
            BlockKind::SetTimingBudget => "setTimingBudget",
            BlockKind::StartRanging => "startRanging",
            BlockKind::IsDataReady => "isDataReady",
            BlockKind::GetDistance => "getDistance",
            BlockKind::ClearInterruptFlag => "clearInterruptFlag",
            BlockKind::GetSensorId => "getSensorID",
        }
    }

    pub fn from_opcode(opcode: &str) -> Option<BlockKind> {
        Self::ALL.into_iter().find(|k| k.opcode() == opcode)
    }

    pub fn shape(self) -> BlockShape {
        match self {
            BlockKind::IsDataReady => BlockShape::Boolean,
            BlockKind::GetDistance | BlockKind::GetSensorId => BlockShape::Reporter,
            _ => BlockShape::Command,
        }
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            BlockKind::Init => INIT_PARAMS,
            BlockKind::SetTimingBudget => BUDGET_PARAMS,
            _ => &[],
        }
    }

    pub fn param_spec(self, name: &str) -> Option<&'static ParamSpec> {
        self.params().iter().find(|p| p.name == name)
    }
}

fn kind_of(block: &BlockInvocation) -> Result<BlockKind, BlockError> {
    BlockKind::from_opcode(&block.opcode)
        .ok_or_else(|| BlockError::UnknownOpcode(block.opcode.clone()))
}

/// Emit one block into `asm`. Reporter and boolean blocks return the
/// expression they produced; command blocks return `None`.
pub fn emit_block(
    asm: &mut ProgramAssembly,
    block: &BlockInvocation,
) -> Result<Option<Expr>, BlockError> {
    match kind_of(block)? {
        BlockKind::Init => {
            let selector = block.code("I2C_SEL")?;
            // SDA/SCL are only read for the software bus.
            let (sda, scl) = if tof400c::BusType::from_selector(selector)
                == tof400c::BusType::Software
            {
                (block.operand("SDA_PIN", ARG)?, block.operand("SCL_PIN", ARG)?)
            } else {
                (Cow::Borrowed(""), Cow::Borrowed(""))
            };
            let xshut = block.operand("XPIN", ARG)?;
            let irq = block.operand("IPIN", ARG)?;
            let address = block.operand("ADDR", ARG)?;
            let params = InitParams {
                xshut_pin: &xshut,
                irq_pin: &irq,
                selector,
                address: &address,
                pins: BusPins {
                    sda: &sda,
                    scl: &scl,
                },
            };
            tof400c::init(asm, &params);
            Ok(None)
        }
        BlockKind::SetTimingBudget => {
            tof400c::set_timing_budget(asm, &block.operand("BUDGET", ARG)?);
            Ok(None)
        }
        BlockKind::StartRanging => {
            tof400c::start_ranging(asm);
            Ok(None)
        }
        BlockKind::ClearInterruptFlag => {
            tof400c::clear_interrupt_flag(asm);
            Ok(None)
        }
        BlockKind::IsDataReady => Ok(Some(tof400c::is_data_ready(asm))),
        BlockKind::GetDistance => Ok(Some(tof400c::get_distance(asm))),
        BlockKind::GetSensorId => Ok(Some(tof400c::get_sensor_id(asm))),
    }
}

/// The value of a reporter block plugged into another block's input. Nothing
/// is registered: the query only names the sensor object.
pub fn reporter_expr(block: &BlockInvocation) -> Result<Expr, BlockError> {
    match kind_of(block)? {
        BlockKind::IsDataReady => Ok(tof400c::data_ready_expr()),
        BlockKind::GetDistance => Ok(tof400c::distance_expr()),
        BlockKind::GetSensorId => Ok(tof400c::sensor_id_expr()),
        _ => Err(BlockError::NotAReporter(block.opcode.clone())),
    }
}
