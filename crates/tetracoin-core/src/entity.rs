use serde::{Deserialize, Serialize};

/// Identifier of an entity, unique within one grid
pub type EntityId = u32;

/// Colors used for coins and containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Gray,
}

impl Color {
    /// Container colors, cycled by the generator
    pub const PALETTE: [Color; 5] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
    ];

    fn initial(&self) -> char {
        match self {
            Color::Red => 'r',
            Color::Blue => 'b',
            Color::Green => 'g',
            Color::Yellow => 'y',
            Color::Purple => 'p',
            Color::Orange => 'o',
            Color::Gray => 'a',
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "RED"),
            Color::Blue => write!(f, "BLUE"),
            Color::Green => write!(f, "GREEN"),
            Color::Yellow => write!(f, "YELLOW"),
            Color::Purple => write!(f, "PURPLE"),
            Color::Orange => write!(f, "ORANGE"),
            Color::Gray => write!(f, "GRAY"),
        }
    }
}

/// Cardinal direction of a player move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row and column offset of one step in this direction
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
            Direction::Left => write!(f, "LEFT"),
            Direction::Right => write!(f, "RIGHT"),
        }
    }
}

/// Lateral side a deflector pushes coins toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Column offset of this side
    pub fn dc(&self) -> isize {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

/// When a gateway opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateCondition {
    /// Opened externally; stays closed under physics alone
    Switch,
    /// Opens once this many coins have been collected across all containers
    CoinCount(u32),
}

/// Trap flavor, cosmetic for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrapKind {
    Spikes,
    Pit,
}

/// Entity kind with its kind-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Coin,
    Container {
        capacity: u32,
        #[serde(default)]
        current_count: u32,
    },
    Obstacle,
    FixedBlock,
    Support,
    Deflector {
        direction: Side,
    },
    Gateway {
        #[serde(default)]
        is_open: bool,
        open_condition: GateCondition,
    },
    Trap {
        subtype: TrapKind,
    },
}

impl EntityKind {
    pub fn container(capacity: u32) -> Self {
        EntityKind::Container {
            capacity,
            current_count: 0,
        }
    }

    pub fn is_coin(&self) -> bool {
        matches!(self, EntityKind::Coin)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, EntityKind::Container { .. })
    }

    /// Whether the player may push this entity
    pub fn is_movable(&self) -> bool {
        matches!(
            self,
            EntityKind::Obstacle | EntityKind::Support | EntityKind::Deflector { .. }
        )
    }

    /// Whether this counts toward obstacle density
    pub fn is_obstacle(&self) -> bool {
        matches!(
            self,
            EntityKind::Obstacle
                | EntityKind::FixedBlock
                | EntityKind::Support
                | EntityKind::Deflector { .. }
                | EntityKind::Gateway { .. }
                | EntityKind::Trap { .. }
        )
    }

    /// Flow-control pieces the obstacle adder may remove during repair
    pub fn is_flow_control(&self) -> bool {
        matches!(
            self,
            EntityKind::Support
                | EntityKind::Deflector { .. }
                | EntityKind::Gateway { .. }
                | EntityKind::Trap { .. }
        )
    }

    /// Never moves and never gives way
    pub fn is_static_solid(&self) -> bool {
        matches!(
            self,
            EntityKind::FixedBlock | EntityKind::Gateway { .. } | EntityKind::Trap { .. }
        )
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Coin => "coin",
            EntityKind::Container { .. } => "container",
            EntityKind::Obstacle => "obstacle",
            EntityKind::FixedBlock => "fixed block",
            EntityKind::Support => "support",
            EntityKind::Deflector { .. } => "deflector",
            EntityKind::Gateway { .. } => "gateway",
            EntityKind::Trap { .. } => "trap",
        }
    }
}

/// A single entity on the grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(flatten)]
    pub kind: EntityKind,
    pub color: Option<Color>,
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub is_falling: bool,
    #[serde(default)]
    pub is_collected: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, color: Option<Color>, row: usize, col: usize) -> Self {
        Self {
            id,
            kind,
            color,
            row,
            col,
            is_falling: false,
            is_collected: false,
        }
    }

    /// Whether this entity still occupies its cell
    pub fn is_live(&self) -> bool {
        !self.is_collected
    }

    /// Remaining room in a container, `None` for other kinds
    pub fn free_capacity(&self) -> Option<u32> {
        match self.kind {
            EntityKind::Container {
                capacity,
                current_count,
            } => Some(capacity.saturating_sub(current_count)),
            _ => None,
        }
    }

    /// Whether a container of this color can take one more coin of `color`
    pub fn accepts(&self, color: Option<Color>) -> bool {
        color.is_some() && self.color == color && self.free_capacity().is_some_and(|n| n > 0)
    }

    /// Grid glyph used by the ASCII rendering
    pub fn glyph(&self) -> char {
        let initial = self.color.map(|c| c.initial()).unwrap_or('?');
        match &self.kind {
            EntityKind::Coin => initial,
            EntityKind::Container { .. } => initial.to_ascii_uppercase(),
            EntityKind::Obstacle => '#',
            EntityKind::FixedBlock => 'X',
            EntityKind::Support => '=',
            EntityKind::Deflector { direction: Side::Left } => '<',
            EntityKind::Deflector { direction: Side::Right } => '>',
            EntityKind::Gateway { is_open: true, .. } => '_',
            EntityKind::Gateway { is_open: false, .. } => 'H',
            EntityKind::Trap { .. } => '^',
        }
    }
}
