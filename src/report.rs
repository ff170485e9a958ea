//! Profitability of resolved chains against market prices

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::calculator::round2;
use crate::index::normalize_resource_name;
use crate::models::{ProductionChain, ResourceTree};

/// The two markets prices are quoted in. Each has its own currency; reports
/// never mix them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Primary,
    Secondary,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Primary => "primary",
            Market::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "p" => Ok(Market::Primary),
            "secondary" | "s" => Ok(Market::Secondary),
            other => Err(format!("unknown market '{}' (expected primary or secondary)", other)),
        }
    }
}

/// Buy and sell price of one unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub buy: f64,
    pub sell: f64,
}

/// Anything able to quote a resource in a market
pub trait PriceSource {
    fn quote(&self, resource: &str, market: Market) -> Option<Quote>;
}

/// In-memory price table keyed by normalized resource name
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    quotes: HashMap<(String, Market), Quote>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: &str, market: Market, quote: Quote) {
        self.quotes
            .insert((normalize_resource_name(resource), market), quote);
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl PriceSource for PriceBook {
    fn quote(&self, resource: &str, market: Market) -> Option<Quote> {
        self.quotes
            .get(&(normalize_resource_name(resource), market))
            .copied()
    }
}

/// Earnings of one chain per root cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ChainProfit {
    pub chain_id: String,
    pub chain_name: String,
    pub market: Market,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    /// Resources with no quote; they count as zero
    pub missing_prices: Vec<String>,
}

impl fmt::Display for ChainProfit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<30} revenue {:>10.2}  cost {:>10.2}  profit {:>10.2}",
            self.chain_name, self.revenue, self.cost, self.profit
        )?;
        if !self.missing_prices.is_empty() {
            write!(f, "  (no {} price: {})", self.market, self.missing_prices.join(", "))?;
        }
        Ok(())
    }
}

/// Sell the final products, buy every market-sourced input
pub fn chain_profit<P: PriceSource + ?Sized>(
    chain: &ProductionChain,
    prices: &P,
    market: Market,
) -> ChainProfit {
    let mut missing = Vec::new();
    let mut seen_missing = HashSet::new();
    let mut note_missing = |resource: &str| {
        if seen_missing.insert(normalize_resource_name(resource)) {
            missing.push(resource.to_string());
        }
    };

    let mut revenue = 0.0;
    let mut cost = 0.0;

    for building in &chain.buildings {
        if building.level == 0 {
            for output in &building.outputs {
                match prices.quote(&output.resource_name, market) {
                    Some(quote) => revenue += output.quantity * building.ratio * quote.sell,
                    None => note_missing(&output.resource_name),
                }
            }
        }

        for input in building.inputs.iter().filter(|i| i.source.is_market()) {
            match prices.quote(&input.resource_name, market) {
                Some(quote) => cost += input.quantity * building.ratio * quote.buy,
                None => note_missing(&input.resource_name),
            }
        }
    }

    ChainProfit {
        chain_id: chain.id.clone(),
        chain_name: chain.name.clone(),
        market,
        revenue: round2(revenue),
        cost: round2(cost),
        profit: round2(revenue - cost),
        missing_prices: missing,
    }
}

/// Profit of every chain in the tree, most profitable first
pub fn profit_report<P: PriceSource + ?Sized>(
    tree: &ResourceTree,
    prices: &P,
    market: Market,
) -> Vec<ChainProfit> {
    let mut report: Vec<ChainProfit> = tree
        .chains
        .iter()
        .map(|chain| chain_profit(chain, prices, market))
        .collect();
    report.sort_by(|a, b| b.profit.total_cmp(&a.profit));
    report
}
