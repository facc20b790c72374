//! The fixed content shown by the showcase.

/// Markdown document rendered by the markdown section, indentation included.
pub const MARKDOWN_TEXT: &str = "
  # Titre principal

  Voici un exemple de code JSX :
  ";

/// JSX snippet rendered by the code section, indentation included.
pub const CODE_SAMPLE: &str = r#"
    function App() {
      return (
        <div className="App">
          <h1>Hello, React!</h1>
        </div>
      );
    }
  "#;

pub const CODE_LANGUAGE: &str = "javascript";

pub const MARKDOWN_HEADING: &str = "Contenu Markdown";

pub const CODE_HEADING: &str = "Code JSX avec SyntaxHighlighter";
