//! Instruction prompts sent to the model.

use crate::models::DiscoveryRecord;

/// Instruction appended after the documents in an analysis request.
pub const ANALYSIS_INSTRUCTIONS: &str = r#"You are analyzing discovery documents for a Salesforce Enterprise Architecture engagement. Extract the following information from these documents:

IMPORTANT: Your response MUST be ONLY valid JSON. Do not include any markdown formatting, backticks, or explanatory text. Start directly with { and end with }.

Extract and return this exact JSON structure (add additional manufacturing/capability-focused fields to help artifact generation):
{
  "companyName": "string - the company name",
  "industry": "string - the industry sector",
  "businessContext": "string - detailed business context, operations, size, market position",
  "currentChallenges": "string - key business and technical challenges they're facing",
  "strategicGoals": "string - their strategic goals and objectives for the next 1-3 years",
  "technicalLandscape": "string - current technology systems, platforms, and tools mentioned",
  "constraints": "string - budget constraints, compliance requirements, technical limitations",
  "timeline": "string - any mentioned project timelines or urgency",
  "budget": "string - budget ranges or financial constraints if mentioned",
  "systems": ["array of system objects found in documents, include name, vendor, type (ERP/MES/CRM/PLM/Other), brief notes"],
  "manufacturingProcesses": ["list any manufacturing-specific processes mentioned (e.g., production planning, MES, quality management, shop floor execution)"],
  "explicitCapabilities": ["capabilities explicitly mentioned in the documents or RFPs (e.g., order management, inventory, BOM management, quality control)"],
  "documentSummaries": ["concise per-document one-sentence summary useful for traceability"]
}

Rules:
- Extract actual content from the provided extracted texts or attached documents.
- Be comprehensive but concise.
- If information is not found, use empty string "" or empty array [].
- Focus on information relevant to Salesforce implementation and discrete manufacturing capabilities.
- Combine information from all documents provided where appropriate.
- Return ONLY the JSON object, nothing else"#;

const ARTIFACT_SCHEMA: &str = r#"{
  "capabilityMap": {
    "businessDrivers": ["driver1", "driver2", "driver3"],
    "sales": [{"capability": "Lead Management", "description": "desc", "salesforceProducts": ["Sales Cloud"]}],
    "service": [{"capability": "Case Management", "description": "desc", "salesforceProducts": ["Service Cloud"]}],
    "marketing": [{"capability": "Campaign Management", "description": "desc", "salesforceProducts": ["Marketing Cloud"]}],
    "commerce": [{"capability": "Order Management", "description": "desc", "salesforceProducts": ["Commerce Cloud"]}],
    "platformData": [{"capability": "Data Integration", "description": "desc", "salesforceProducts": ["Data Cloud", "MuleSoft"]}],
    "industrySpecific": [{"capability": "Industry Solution", "description": "desc", "salesforceProducts": ["Financial Services Cloud"]}]
  },
  "currentStateArchitecture": {
    "overview": "Current state summary",
    "systemsOfRecord": [{"name": "CRM System", "businessCapability": "Customer Management", "salesforceOpportunity": "Replace with Sales Cloud", "recommendedSalesforceProducts": ["Sales Cloud"]}],
    "systemsOfDifferentiation": [{"name": "Portal", "businessCapability": "Customer Portal", "salesforceOpportunity": "Enhance with Experience Cloud", "recommendedSalesforceProducts": ["Experience Cloud"]}],
    "systemsOfInnovation": [{"name": "AI Bot", "emergingCapability": "Chatbot", "salesforceOpportunity": "Implement Agentforce", "recommendedSalesforceProducts": ["Agentforce"]}]
  },
  "futureStateArchitecture": {
    "overview": "Future vision with Salesforce",
    "platformComponents": {
      "dataUnification": "Data Cloud strategy",
      "integration": "MuleSoft approach",
      "analytics": "Tableau strategy",
      "aiAutomation": "Einstein AI opportunities"
    },
    "systemsOfRecord": [{"name": "Sales Cloud", "futureVision": "Unified CRM", "salesforceProducts": ["Sales Cloud"], "timeline": "Q1 2026", "benefits": ["Benefit 1", "Benefit 2"]}],
    "systemsOfDifferentiation": [],
    "systemsOfInnovation": []
  },
  "prioritizationMatrix": [
    {"initiative": "Sales Cloud Implementation", "businessValue": "High", "effort": "Medium", "roi": "High", "priority": 1, "description": "Deploy Sales Cloud"}
  ],
  "strategicRoadmap": [
    {"phase": "Phase 1: Foundation", "initiatives": ["Deploy Sales Cloud", "Integrate Data"], "outcomes": ["Unified CRM", "Clean data"]}
  ]
}"#;

/// Build the artifact-generation prompt for a discovery record.
pub fn generation_prompt(discovery: &DiscoveryRecord) -> String {
    format!(
        "You are a Salesforce Enterprise Architect creating artifacts for {company} in the {industry} industry.

Business Context: {context}
Current Challenges: {challenges}
Strategic Goals: {goals}
Technical Landscape: {landscape}

Generate ONLY valid JSON (no markdown, no explanation) with this EXACT structure:
{schema}

Return ONLY the JSON object, nothing else.",
        company = discovery.company_name,
        industry = discovery.industry,
        context = discovery.business_context,
        challenges = discovery.current_challenges,
        goals = discovery.strategic_goals,
        landscape = discovery.technical_landscape,
        schema = ARTIFACT_SCHEMA,
    )
}
