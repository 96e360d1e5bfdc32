//! 各阶段的 Prompt 模板
//!
//! 每个 Prompt 的首行概括该调用的目的（Mock 后端回显首行，日志与测试据此区分调用）。

use crate::trip::TravelConstraints;

pub fn weather_prompt(destination: &str, duration_days: u32) -> String {
    format!(
        r#"Provide current weather information and forecast for {destination} for the next {duration_days} days.
Include:
- Current season and typical weather patterns
- Temperature ranges
- Precipitation likelihood
- Best times to visit outdoor attractions
- Seasonal considerations for activities

Format as structured data."#
    )
}

pub fn events_prompt(destination: &str) -> String {
    format!(
        r#"Research current events, festivals, and seasonal activities in {destination}.
Focus on events happening in the next 30 days.
Include:
- Cultural festivals
- Local markets
- Seasonal activities
- Special exhibitions or shows
- Food festivals or wine harvests

Provide specific dates when possible."#
    )
}

pub fn attractions_prompt(destination: &str) -> String {
    format!(
        r#"List the top 15-20 attractions and points of interest in {destination}.
For each attraction, provide:
- Name
- Brief description
- Approximate coordinates (lat, lng)
- Category (historical, natural, cultural, etc.)
- Typical visit duration
- Entry cost (if any)
- Best time to visit

Format as JSON array."#
    )
}

pub fn accommodation_prompt(destination: &str, c: &TravelConstraints) -> String {
    format!(
        r#"Research accommodation options in {destination} for {travelers} travelers.
Budget: ${nightly:.0} per night
Duration: {days} days
Style: {style}

Provide recommendations for:
- Hotels in different price ranges
- Guesthouses or B&Bs
- Unique local accommodation options

Include pricing, locations, and booking considerations."#,
        travelers = c.traveler_count(),
        nightly = c.nightly_accommodation_budget(),
        days = c.duration_days(),
        style = c.travel_style(),
    )
}

pub fn transport_prompt(destination: &str, c: &TravelConstraints) -> String {
    format!(
        r#"Research transportation options in and around {destination} for {days} days.
Consider:
- Airport transfers
- Public transportation
- Car rental options and costs
- Inter-city transport
- Walking distances between attractions
- Local transport apps or services

Provide practical advice for {travelers} travelers with {style} style."#,
        days = c.duration_days(),
        travelers = c.traveler_count(),
        style = c.travel_style(),
    )
}

/// 五项检索结果按固定顺序拼入综合 Prompt
pub struct ResearchDigest<'a> {
    pub weather: &'a str,
    pub events: &'a str,
    pub attractions: &'a str,
    pub accommodation: &'a str,
    pub transport: &'a str,
}

pub fn synthesis_prompt(destination: &str, digest: &ResearchDigest<'_>, constraints_json: &str) -> String {
    format!(
        r#"Synthesize the following travel research data for {destination}:

Weather: {weather}
Events: {events}
Attractions: {attractions}
Accommodation: {accommodation}
Transport: {transport}

Constraints: {constraints_json}

Provide a structured summary including:
1. Best areas to stay
2. Must-see attractions with priorities
3. Optimal transportation strategy
4. Seasonal considerations
5. Budget allocation recommendations
6. Potential challenges or considerations
7. Daily activity suggestions

Format as structured JSON."#,
        weather = digest.weather,
        events = digest.events,
        attractions = digest.attractions,
        accommodation = digest.accommodation,
        transport = digest.transport,
    )
}

pub fn itinerary_prompt(destination: &str, research_json: &str, c: &TravelConstraints) -> String {
    format!(
        r#"Create an optimized {days}-day itinerary for {destination} based on this research data:

{research_json}

Constraints:
- Total budget: ${budget}
- Travelers: {travelers}
- Style: {style}
- Preferences: {preferences}

Create a day-by-day itinerary that:
1. Optimizes travel time between locations
2. Groups activities by geographic proximity
3. Balances indoor/outdoor activities based on weather
4. Fits within budget constraints
5. Includes specific timing for activities
6. Suggests accommodation locations
7. Plans transportation between cities/regions

Format as structured JSON with this schema:
{{
    "itinerary": [
        {{
            "day": 1,
            "date": "2024-XX-XX",
            "location": "City/Area Name",
            "activities": [
                {{
                    "time": "09:00",
                    "activity": "Activity Name",
                    "duration": "2 hours",
                    "cost": 25.00,
                    "description": "Brief description",
                    "location": "Specific location"
                }}
            ],
            "accommodation": "Hotel/Area recommendation",
            "transportation": "How to get around",
            "daily_budget": 150.00,
            "notes": "Special considerations"
        }}
    ]
}}"#,
        days = c.duration_days(),
        budget = c.total_budget_usd(),
        travelers = c.traveler_count(),
        style = c.travel_style(),
        preferences = c.preferences_joined(),
    )
}

pub fn logistics_prompt(itinerary_json: &str) -> String {
    format!(
        r#"Optimize the logistics of this itinerary:

{itinerary_json}

Focus on:
1. Minimizing travel time between activities
2. Optimizing daily schedules (avoid rushing, allow buffer time)
3. Grouping activities by location
4. Considering opening hours and booking requirements
5. Planning meal times and breaks
6. Accounting for transportation delays

Return the optimized itinerary with the same JSON structure but improved timing and logistics."#
    )
}

pub fn cost_prompt(itinerary_json: &str, c: &TravelConstraints) -> String {
    format!(
        r#"Analyze the costs for this itinerary:

{itinerary_json}

Budget: ${budget}
Travelers: {travelers}

Provide detailed cost breakdown:
1. Daily costs by category (accommodation, food, activities, transport)
2. Total estimated cost
3. Budget vs actual comparison
4. Cost optimization suggestions if over budget
5. Buffer recommendations

Format as JSON with specific cost figures."#,
        budget = c.total_budget_usd(),
        travelers = c.traveler_count(),
    )
}

pub fn personalize_prompt(itinerary_json: &str, c: &TravelConstraints, research_json: &str) -> String {
    format!(
        r#"Personalize this travel itinerary based on user preferences:

ITINERARY:
{itinerary_json}

USER PROFILE:
- Preferences: {preferences}
- Travel style: {style}
- Group size: {travelers}
- Must visit: {must_visit}
- Avoid: {avoid}

RESEARCH CONTEXT:
{research_json}

Personalize by:
1. Replacing generic recommendations with specific ones matching preferences
2. Adjusting activity types and intensity based on travel style
3. Adding local experiences that match interests
4. Suggesting restaurants and food experiences
5. Including shopping or cultural activities if relevant
6. Adding photography spots if interested in photography
7. Suggesting local interactions or cultural immersion opportunities

Keep the same JSON structure but enhance with personalized details."#,
        preferences = c.preferences_joined(),
        style = c.travel_style(),
        travelers = c.traveler_count(),
        must_visit = list_or_none(c.must_visit()),
        avoid = list_or_none(c.avoid()),
    )
}

pub fn context_prompt(itinerary_json: &str) -> String {
    format!(
        r#"Enhance this personalized itinerary with contextual recommendations:

{itinerary_json}

Add:
1. Local etiquette and cultural tips
2. Language phrases that might be helpful
3. Tipping customs and payment methods
4. Safety considerations
5. Packing suggestions specific to activities
6. Alternative options for bad weather
7. Local apps or services to download
8. Emergency contacts and important information

Format as enhanced JSON with additional context fields."#
    )
}

fn list_or_none(items: Option<&[String]>) -> String {
    match items {
        Some(items) if !items.is_empty() => items.join(", "),
        _ => "None specified".to_string(),
    }
}
