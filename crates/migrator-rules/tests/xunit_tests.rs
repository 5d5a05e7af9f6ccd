use migrator_core::{MigrationConfig, Phase};
use migrator_rules::{migrate_source, Framework};
use pretty_assertions::assert_eq;

fn migrate(source: &str) -> anyhow::Result<migrator_core::MigrationOutcome> {
    Ok(migrate_source(source, Framework::XUnit, &MigrationConfig::default())?)
}

const CALCULATOR: &str = r#"using System;
using Xunit;

namespace Demo
{
    public class CalculatorTests
    {
        [Fact]
        public void Adds()
        {
            Assert.Equal(4, Add(2, 2));
        }

        [Theory]
        [InlineData(1, 2)]
        public void Orders(int a, int b)
        {
            Assert.True(a < b, "ordered");
        }
    }
}
"#;

const CALCULATOR_TUNIT: &str = r#"using System;
using TUnit.Core;
using TUnit.Assertions;
using TUnit.Assertions.Extensions;
using System.Threading.Tasks;

namespace Demo
{
    public class CalculatorTests
    {
        [Test]
        public async Task Adds()
        {
            await Assert.That(Add(2, 2)).IsEqualTo(4);
        }

        [Test]
        [Arguments(1, 2)]
        public async Task Orders(int a, int b)
        {
            await Assert.That(a < b).IsTrue().Because("ordered");
        }
    }
}
"#;

#[test]
fn test_facts_and_theories() -> anyhow::Result<()> {
    let outcome = migrate(CALCULATOR)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    assert_eq!(outcome.source(), CALCULATOR_TUNIT);
    Ok(())
}

#[test]
fn test_assertion_catalogue() -> anyhow::Result<()> {
    let source = r#"using Xunit;

public class Checks
{
    [Fact]
    public void All()
    {
        Assert.NotEqual(1, value);
        Assert.Null(item);
        Assert.Same(expected, actual);
        Assert.Empty(items);
        Assert.Single(items);
        Assert.Contains("b", text);
        Assert.StartsWith("a", text);
        Assert.InRange(value, 1, 10);
        Assert.IsType<Circle>(shape);
        Assert.IsAssignableFrom<IShape>(shape);
        Assert.ThrowsAny<InvalidOperationException>(() => Run());
        Assert.All(items, x => Assert.True(x > 0));
        Assert.Fail("unreachable");
    }
}
"#;
    let out = migrate(source)?.source();
    for line in [
        "await Assert.That(value).IsNotEqualTo(1);",
        "await Assert.That(item).IsNull();",
        "await Assert.That(actual).IsSameReferenceAs(expected);",
        "await Assert.That(items).IsEmpty();",
        "await Assert.That(items).HasSingleItem();",
        "await Assert.That(text).Contains(\"b\");",
        "await Assert.That(text).StartsWith(\"a\");",
        "await Assert.That(value).IsInRange(1, 10);",
        "await Assert.That(shape).IsTypeOf<Circle>();",
        "await Assert.That(shape).IsAssignableTo<IShape>();",
        "await Assert.That(() => Run()).Throws<InvalidOperationException>();",
        "await Assert.That(items).All(x => x > 0);",
        "Assert.Fail(\"unreachable\");",
        "public async Task All()",
    ] {
        assert!(out.contains(line), "missing `{}` in\n{}", line, out);
    }
    Ok(())
}

#[test]
fn test_assigned_and_throws_assertions_are_kept() -> anyhow::Result<()> {
    let source = r#"using Xunit;

public class Checks
{
    [Fact]
    public void Throwing()
    {
        var ex = Assert.Throws<ArgumentException>(() => Parse(""));
        Assert.Throws<FormatException>(() => Parse("x"));
    }
}
"#;
    let outcome = migrate(source)?;
    let out = outcome.source();
    assert!(out.contains("var ex = Assert.Throws<ArgumentException>(() => Parse(\"\"));"));
    assert!(out.contains("        Assert.Throws<FormatException>(() => Parse(\"x\"));"));
    assert!(out.contains("public void Throwing()"));
    assert!(!outcome.has_failures());
    Ok(())
}

#[test]
fn test_assertions_outside_plain_statements() -> anyhow::Result<()> {
    let source = r#"using System;
using Xunit;

public class Deferred
{
    [Fact]
    public void Later()
    {
        Action check = () => Assert.True(false);
        check();
    }

    [Fact]
    public void Arrow() => Assert.Null(item);

    [Fact]
    public void Picks()
    {
        var only = Assert.Single(items);
    }
}
"#;
    let outcome = migrate(source)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    let out = outcome.source();
    for line in [
        "Action check = () => Assert.That(false).IsTrue().Wait();",
        "public void Later()",
        "public async Task Arrow() => await Assert.That(item).IsNull();",
        "var only = await Assert.That(items).HasSingleItem();",
        "public async Task Picks()",
    ] {
        assert!(out.contains(line), "missing `{}` in\n{}", line, out);
    }
    assert!(!out.contains("Assert.True"));
    Ok(())
}

#[test]
fn test_unsupported_assertion_is_reported() -> anyhow::Result<()> {
    let source = "using Xunit;\n\npublic class T\n{\n    [Fact]\n    public void M()\n    {\n        Assert.Subset(all, some);\n    }\n}\n";
    let outcome = migrate(source)?;
    let failures: Vec<_> = outcome.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].phase, Phase::AssertionAnalysis);
    assert_eq!(failures[0].original_text, "Assert.Subset(all, some)");
    assert!(outcome.source().contains("        Assert.Subset(all, some);\n"));
    Ok(())
}

#[test]
fn test_markers() -> anyhow::Result<()> {
    let source = r#"using Xunit;

[Collection("Database")]
public class DataTests
{
    [Fact(Skip = "flaky")]
    public void Skipped() { }

    [Theory]
    [MemberData(nameof(Rows))]
    [Trait("Category", "Slow")]
    public void FromMember(int x) { }

    [Theory]
    [MemberData(nameof(Shared.Rows), MemberType = typeof(Shared))]
    public void FromOtherType(int x) { }

    [Theory]
    [ClassData(typeof(RowSource))]
    public void FromClass(int x) { }
}
"#;
    let outcome = migrate(source)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    let out = outcome.source();
    assert!(!out.contains("Collection"));
    for line in [
        "    [Test]\n    [Skip(\"flaky\")]\n    public void Skipped() { }",
        "    [MethodDataSource(nameof(Rows))]",
        "    [Property(\"Category\", \"Slow\")]",
        "    [MethodDataSource(typeof(Shared), nameof(Shared.Rows))]",
        "    [MethodDataSource(typeof(RowSource), \"GetEnumerator\")]",
    ] {
        assert!(out.contains(line), "missing `{}` in\n{}", line, out);
    }
    assert!(out.starts_with("using TUnit.Core;\n"));
    Ok(())
}

#[test]
fn test_fixture_and_output_helper() -> anyhow::Result<()> {
    let source = r#"using System;
using Xunit;
using Xunit.Abstractions;

public class ServiceTests : IClassFixture<DatabaseFixture>
{
    private readonly ITestOutputHelper _output;

    public ServiceTests(DatabaseFixture fixture, ITestOutputHelper output)
    {
    }

    [Fact]
    public void Logs()
    {
        _output.WriteLine("value: {0}", 42);
    }
}
"#;
    let outcome = migrate(source)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    let out = outcome.source();
    assert!(out.contains("[ClassDataSource<DatabaseFixture>(Shared = SharedType.PerClass)]\npublic class ServiceTests\n"));
    assert!(!out.contains("ITestOutputHelper"));
    assert!(out.contains("public ServiceTests(DatabaseFixture fixture)"));
    assert!(out.contains("        Console.WriteLine(\"value: {0}\", 42);\n"));
    assert!(!out.contains("Xunit"));
    Ok(())
}

#[test]
fn test_async_lifetime_on_test_class() -> anyhow::Result<()> {
    let source = r#"using System.Threading.Tasks;
using Xunit;

public class LifetimeTests : IAsyncLifetime
{
    public async ValueTask InitializeAsync() { await Task.Yield(); }

    public ValueTask DisposeAsync() => default;

    [Fact]
    public void Works() { }
}
"#;
    let outcome = migrate(source)?;
    let out = outcome.source();
    assert!(out.contains("public class LifetimeTests\n"), "{}", out);
    assert!(out.contains("    [Before(Test)]\n    public async Task InitializeAsync()"), "{}", out);
    assert!(out.contains("    [After(Test)]\n    public Task DisposeAsync()"), "{}", out);
    Ok(())
}

#[test]
fn test_async_lifetime_on_fixture() -> anyhow::Result<()> {
    let source = r#"using System.Threading.Tasks;
using Xunit;

public class DatabaseFixture : IAsyncLifetime
{
    public async ValueTask InitializeAsync() { await Task.Yield(); }

    public async ValueTask DisposeAsync() { await Task.Yield(); }
}
"#;
    let outcome = migrate(source)?;
    let out = outcome.source();
    assert!(out.contains("public class DatabaseFixture : IAsyncInitializer, IAsyncDisposable"), "{}", out);
    assert!(out.contains("public async Task InitializeAsync()"), "{}", out);
    assert!(out.contains("public async ValueTask DisposeAsync()"), "{}", out);
    Ok(())
}

#[test]
fn test_record_exception_capture() -> anyhow::Result<()> {
    let source = r#"using Xunit;

public class T
{
    [Fact]
    public void Captures()
    {
        var ex = Record.Exception(() => Run());
        Assert.Null(ex);
    }
}
"#;
    let outcome = migrate(source)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    let out = outcome.source();
    let expected = "        Exception? ex = null;\n        try\n        {\n            Run();\n        }\n        catch (Exception e)\n        {\n            ex = e;\n        }\n        await Assert.That(ex).IsNull();\n";
    assert!(out.contains(expected), "{}", out);
    assert!(out.contains("using System;\n"));
    Ok(())
}

#[test]
fn test_theory_data_becomes_enumerable() -> anyhow::Result<()> {
    let source = r#"using Xunit;

public class T
{
    public static TheoryData<int, string> Rows = new TheoryData<int, string> { { 1, "a" }, { 2, "b" } };
}
"#;
    let outcome = migrate(source)?;
    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    let out = outcome.source();
    assert!(out.contains("public static IEnumerable<(int, string)> Rows = new (int, string)[]"), "{}", out);
    assert!(out.contains("{ (1, \"a\"), (2, \"b\") };"), "{}", out);
    assert!(out.contains("using System.Collections.Generic;"));
    Ok(())
}
