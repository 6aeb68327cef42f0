//! The fixed classification prompt.

use crate::model::attachment::AttachmentId;

/// JSON-encode the ids the way they are shown to the model (2-space indent).
pub fn attachments_json(ids: &[AttachmentId]) -> String {
    serde_json::to_string_pretty(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Embed the attachment list and the normalized body into the instruction template.
pub fn build_prompt(ids: &[AttachmentId], html_body: &str) -> String {
    let attachments_json = attachments_json(ids);
    format!(
        r#"You are analyzing an email to classify its attachments. 

The email's HTML body is provided below. Based ONLY on the HTML content, classify each attachment as either "relevant" or "irrelevant".

- **relevant**: Attachments that contain meaningful information that should be extracted from the email. This includes:
  - Documents (PDFs, Word docs, spreadsheets, etc.)
  - Reports, invoices, receipts, forms, orders, contracts
  - Data files (CSV, JSON, etc.)
  - Document-scan images (scanned documents, receipts, forms, letters, etc. - even if they are images, they contain document content)
  - Images that are mentioned alongside documents or as part of a document set
  - Any attachment that contains substantive information or data from the email
  - If the email mentions "attached X documents/files/orders/etc", count the attachments and ensure the mentioned number are classified as relevant
  
- **irrelevant**: Attachments that are just noise in the HTML. This includes:
  - Social media icons (Facebook, Twitter, LinkedIn logos, etc.)
  - Company logos used for branding (unless they are part of a document)
  - Signature images (decorative signature graphics embedded in email signatures)
  - Decorative images (banners, dividers, background images)
  - Marketing images (newsletter headers, promotional graphics)
  - Any image that is purely decorative or branding-related and NOT mentioned as a document

CRITICAL RULES:
- Base your classification ONLY on how the attachment is referenced or used in the HTML body
- Do NOT use the filename, file type, Content-Disposition, or any other metadata
- IGNORE generic legal disclaimers that mention "attachments" - these are boilerplate text and don't refer to specific attachments
- Focus on the ACTUAL EMAIL CONTENT (the main message body, not email headers, signatures, or disclaimers)

RELEVANT attachments are those that:
1. Are explicitly mentioned in the email content (e.g., "see attached 5 orders", "please find attached documents", "attached files")
2. Are part of a COUNTED set: If email says "5 attached orders" or "attached 5 documents", you MUST classify EXACTLY that many non-decorative attachments as relevant. This includes:
   - PDFs and document files
   - Image files (PNG, JPG) that are document scans (scanned orders, receipts, forms)
   - Any attachment that could contain the mentioned documents
3. Are document-scan images when email context suggests documents are being shared:
   - If email says "Orders are released", "Documents attached", or similar context suggesting documents, image attachments that could be document scans should be RELEVANT
   - When email mentions documents/orders/files in context, image attachments are likely document scans and should be RELEVANT (unless clearly decorative like logos)

IRRELEVANT attachments are those that:
1. Are NOT mentioned in the actual email content (only in generic disclaimers)
2. Are decorative images (logos, icons, signature graphics, banners) embedded in email formatting - these are clearly branding/formatting, not documents
3. Exist in emails with very short content (like "o.k.", "thanks", "Danke!") that don't mention attachments - in these cases, ALL attachments should be IRRELEVANT, even PDFs
4. Are in email threads where the current message doesn't reference them and the message is just a brief response

CRITICAL COUNTING RULE:
- If email mentions a specific number (e.g., "5 attached orders", "see attached 5 documents"), you MUST count ALL non-decorative attachments and classify that many as relevant
- When counting, include both PDFs AND image files that could be document scans
- Only exclude clearly decorative images (logos, icons) from the count
- Example: Email says "5 attached orders", there are 6 attachments (5 PDFs + 1 PNG that's a document scan + 1 JPG that's a logo) → 5 PDFs + 1 PNG = 6 relevant, 1 JPG logo = irrelevant

STRICT RULE FOR SHORT EMAILS:
- If email content is very brief (just "o.k.", "thanks", "Danke!", etc.) with NO mention of attachments, documents, or files, then ALL attachments should be IRRELEVANT, regardless of file type (even PDFs)
- Short acknowledgment emails without attachment mentions mean attachments are likely from forwarded threads and not relevant to the current message

Attachments to classify:
{attachments_json}

HTML Body:
{html_body}

Respond with a JSON object in this exact format:
{{
  "relevant": ["filename1", "filename2", ...],
  "irrelevant": ["filename3", "filename4", ...]
}}

Every attachment must be classified into exactly one category. Return only the JSON, no other text."#
    )
}
