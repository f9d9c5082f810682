use crate::context::AnalysisContext;
use crate::error::AgentError;

/// Response schema included in the per-product system prompt.
fn response_schema() -> String {
    let example = serde_json::json!({
        "analysis": "<brief summary of the current situation with specific numbers>",
        "opportunities": [
            {
                "type": "arbitrage|restock|price_optimization",
                "confidence": 0.75,
                "potential_profit": 120.0,
                "source_store": "<store_id or null>",
                "target_store": "<store_id or null>",
                "quantity": 50,
                "reasoning": "<explanation>",
                "urgency": "low|medium|high|critical"
            }
        ],
        "recommendations": ["<action>"],
        "risk_level": "low|medium|high",
        "confidence_score": 0.7
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

/// Fixed system prompt for the agent that manages `product_id`.
pub fn product_system_prompt(product_id: &str) -> String {
    format!(
        "You are an AI agent managing product {product_id} in a multi-store inventory \
         arbitrage system.\n\n\
         ## RESPONSIBILITIES\n\n\
         1. INVENTORY ANALYSIS: monitor stock levels across stores and look for imbalances\n\
         2. ARBITRAGE DETECTION: find profitable transfer opportunities between stores\n\
         3. MARKET OPTIMIZATION: suggest pricing and stocking strategies\n\
         4. RISK ASSESSMENT: evaluate trading risks\n\n\
         ## DATA FORMAT\n\n\
         The user message is a JSON document with these keys:\n\
         - `product_info`: id, name, category, brand, standard_retail_price, base_cost, \
         margin_targets\n\
         - `inventory_summary`: total_units, stores_count, high_stock_stores (>200 units), \
         low_stock_stores (below reorder point), critical_low_stores (below half the reorder \
         point), average_stock_per_store\n\
         - `inventory_details`: up to 15 rows of \
         {{store_id, quantity, reorder_point, retail_price}}\n\
         - `arbitrage_candidates`: pre-computed pairs from a high-stock store to a critical-low \
         store whose quantity_diff exceeds 100, widest gap first\n\
         - `marketplace_state`: active_bids, recent_matches, market_activity (high|low)\n\
         - `analysis_timestamp`\n\n\
         ## OPPORTUNITY TYPES\n\n\
         - ARBITRAGE: one store has high stock and another has low stock of this product. \
         Source: high inventory. Target: below 50% of reorder point. \
         Profit = (quantity * retail_price * 0.15) - transport costs, with transport at \
         $5-20 per unit.\n\
         - RESTOCK: a store is below its reorder point. Source: the highest-inventory store. \
         Profit = (quantity * margin_per_unit) - transport costs.\n\
         - PRICE_OPTIMIZATION: current pricing does not match margin targets.\n\n\
         ## RULES\n\n\
         - ALWAYS name both source_store and target_store for arbitrage and restock \
         opportunities, and never use the same store for both.\n\
         - Prefer the listed arbitrage_candidates; do not invent store ids.\n\
         - confidence and confidence_score are numbers between 0 and 1.\n\
         - quantity is a non-negative whole number of units.\n\
         - Return an empty opportunities array when nothing is worth doing.\n\n\
         ## OUTPUT FORMAT\n\n\
         Respond with ONLY a JSON object, no other text:\n{}",
        response_schema()
    )
}

/// User prompt: the analysis context as pretty JSON.
pub fn product_user_prompt(context: &AnalysisContext) -> Result<String, AgentError> {
    Ok(serde_json::to_string_pretty(context)?)
}
